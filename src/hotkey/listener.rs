//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` has no graceful shutdown API: the thread stays blocked in
//! the OS event loop until the process exits.  [`HotkeyListener`] therefore
//! owns a stop flag instead of a join handle — dropping the listener sets the
//! flag and the callback silently discards everything from then on.  The
//! stuck thread holds no resources that need explicit cleanup.
//!
//! OS key auto-repeat delivers a stream of additional press events while a
//! key is held.  The callback tracks the key's down state and forwards only
//! the first press of each hold, so the consumer sees strictly alternating
//! press/release pairs.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::HotkeyEvent;

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
///
/// Construct one with [`HotkeyListener::start`]; drop it to stop forwarding
/// events.
pub struct HotkeyListener {
    /// Shared stop flag — set `true` on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Kept so the thread is not detached prematurely; never joined because
    /// `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the listener thread watching `key` and forwarding
    /// [`HotkeyEvent::Pressed`] / [`HotkeyEvent::Released`] on `tx`.
    ///
    /// The thread uses `blocking_send`, which is the correct way to feed a
    /// tokio channel from a non-async context.  If the channel is full the
    /// send blocks the listener thread briefly rather than dropping the
    /// event, preserving strict press/release ordering.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to create the thread (extremely unlikely).
    pub fn start(key: rdev::Key, tx: mpsc::Sender<HotkeyEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                // Tracks whether the key is currently held, to swallow OS
                // auto-repeat presses.
                let mut key_down = false;

                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }

                    let forwarded = match event.event_type {
                        rdev::EventType::KeyPress(k) if k == key => {
                            if key_down {
                                return; // auto-repeat
                            }
                            key_down = true;
                            HotkeyEvent::Pressed
                        }
                        rdev::EventType::KeyRelease(k) if k == key => {
                            key_down = false;
                            HotkeyEvent::Released
                        }
                        _ => return,
                    };
                    let _ = tx.blocking_send(forwarded);
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {:?}", e);
                }
            })
            .expect("failed to spawn hotkey-listener thread");

        Self {
            stop,
            _thread: thread,
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
