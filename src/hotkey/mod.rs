//! Global push-to-talk hotkey listener, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive, so it must run on a dedicated OS thread — it cannot live
//! inside a tokio task.  [`HotkeyListener::start`] spawns that thread and
//! forwards discrete [`HotkeyEvent::Pressed`] / [`HotkeyEvent::Released`]
//! events over a bounded `tokio::sync::mpsc` channel, preserving the order
//! in which the OS delivered them.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use voiceflow::hotkey::{HotkeyEvent, HotkeyListener, parse_key};
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let key = parse_key("F9").expect("unknown key");
//! let _listener = HotkeyListener::start(key, tx);
//!
//! // In your async loop:
//! // while let Some(ev) = rx.recv().await { ... }
//! ```

pub mod listener;

pub use listener::HotkeyListener;

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Discrete events emitted by the hotkey listener thread.
///
/// These are the only two event types the recording controller consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The push-to-talk key went down.
    Pressed,
    /// The push-to-talk key came back up.
    Released,
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a key name from a config string into an [`rdev::Key`].
///
/// Supports F1–F12, a set of common named keys, and single ASCII letters
/// (case-insensitive).  Returns `None` for unrecognised names so callers can
/// reject the configuration at startup.
///
/// # Examples
///
/// ```
/// use voiceflow::hotkey::parse_key;
///
/// assert_eq!(parse_key("F9"),     Some(rdev::Key::F9));
/// assert_eq!(parse_key("Space"),  Some(rdev::Key::Space));
/// assert_eq!(parse_key("t"),      Some(rdev::Key::KeyT));
/// assert_eq!(parse_key("Ctrl+V"), None);
/// ```
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    use rdev::Key;

    let key = match name {
        "F1" => Key::F1,
        "F2" => Key::F2,
        "F3" => Key::F3,
        "F4" => Key::F4,
        "F5" => Key::F5,
        "F6" => Key::F6,
        "F7" => Key::F7,
        "F8" => Key::F8,
        "F9" => Key::F9,
        "F10" => Key::F10,
        "F11" => Key::F11,
        "F12" => Key::F12,
        "Space" => Key::Space,
        "Escape" | "Esc" => Key::Escape,
        "Return" | "Enter" => Key::Return,
        "Tab" => Key::Tab,
        "Home" => Key::Home,
        "End" => Key::End,
        "PageUp" => Key::PageUp,
        "PageDown" => Key::PageDown,
        "CapsLock" => Key::CapsLock,
        "ScrollLock" => Key::ScrollLock,
        "Pause" => Key::Pause,
        other => return parse_letter(other),
    };
    Some(key)
}

/// Map a single ASCII letter (either case) to its `rdev` key.
fn parse_letter(name: &str) -> Option<rdev::Key> {
    use rdev::Key;

    const LETTERS: [Key; 26] = [
        Key::KeyA, Key::KeyB, Key::KeyC, Key::KeyD, Key::KeyE, Key::KeyF, Key::KeyG,
        Key::KeyH, Key::KeyI, Key::KeyJ, Key::KeyK, Key::KeyL, Key::KeyM, Key::KeyN,
        Key::KeyO, Key::KeyP, Key::KeyQ, Key::KeyR, Key::KeyS, Key::KeyT, Key::KeyU,
        Key::KeyV, Key::KeyW, Key::KeyX, Key::KeyY, Key::KeyZ,
    ];

    let mut chars = name.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let idx = (c.to_ascii_lowercase() as u32).checked_sub('a' as u32)?;
    LETTERS.get(idx as usize).copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
