//! Text delivery — clipboard write followed by a paste keystroke.
//!
//! # Overview
//!
//! The final pipeline stage places the enhanced text where the user wanted
//! it: in the application that currently has input focus.  Two steps, in a
//! fixed order:
//!
//! 1. **Clipboard** — write the text via `arboard`.
//! 2. **Insert** — simulate Ctrl+V (⌘V on macOS) via `enigo`.
//!
//! The order matters: if the paste keystroke fails (sandboxed target,
//! missing permissions, focus lost) the text is already on the clipboard
//! and the user can paste it manually.  For the same reason the previous
//! clipboard content is **not** restored afterwards.
//!
//! Delivery problems never fail the pipeline — they are logged and reported
//! through [`DeliveryReport`].

pub mod clipboard;
pub mod keyboard;

pub use clipboard::set_clipboard;
pub use keyboard::simulate_paste;

use std::time::Duration;

use thiserror::Error;

use crate::config::DeliveryConfig;

// ---------------------------------------------------------------------------
// DeliveryError
// ---------------------------------------------------------------------------

/// Errors that can surface during text delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Could not open the system clipboard.
    #[error("cannot access clipboard: {0}")]
    ClipboardAccess(String),

    /// Could not write text to the system clipboard.
    #[error("cannot set clipboard text: {0}")]
    ClipboardSet(String),

    /// Could not simulate the paste key chord.
    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),
}

// ---------------------------------------------------------------------------
// DeliveryReport / TextDelivery
// ---------------------------------------------------------------------------

/// What actually happened during delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// The text made it onto the clipboard (the minimum contract).
    pub clipboard_set: bool,
    /// The paste keystroke was delivered to the focused window.
    pub inserted: bool,
}

/// The delivery stage as the pipeline sees it.
///
/// Blocking by design — callers run it on the blocking thread pool.  An
/// `Err` means even the clipboard write failed; an `Ok` report with
/// `inserted: false` means the user can still paste manually.
pub trait TextDelivery: Send + Sync {
    fn deliver(&self, text: &str) -> Result<DeliveryReport, DeliveryError>;
}

// ---------------------------------------------------------------------------
// SystemDelivery
// ---------------------------------------------------------------------------

/// Production delivery using the real clipboard and keyboard.
#[derive(Debug, Clone)]
pub struct SystemDelivery {
    /// Pause between the clipboard write and the paste keystroke so the
    /// clipboard manager has flushed before the target app reads it.
    paste_delay: Duration,
    /// When `false`, stop after the clipboard write.
    insert_enabled: bool,
}

impl SystemDelivery {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            paste_delay: Duration::from_millis(config.paste_delay_ms),
            insert_enabled: config.insert_enabled,
        }
    }
}

impl TextDelivery for SystemDelivery {
    fn deliver(&self, text: &str) -> Result<DeliveryReport, DeliveryError> {
        set_clipboard(text)?;

        if !self.insert_enabled {
            return Ok(DeliveryReport {
                clipboard_set: true,
                inserted: false,
            });
        }

        std::thread::sleep(self.paste_delay);

        let inserted = match simulate_paste() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("paste keystroke failed ({e}); text remains on the clipboard");
                false
            }
        };

        Ok(DeliveryReport {
            clipboard_set: true,
            inserted,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_picks_up_settings() {
        let delivery = SystemDelivery::from_config(&DeliveryConfig {
            insert_enabled: false,
            paste_delay_ms: 120,
        });
        assert!(!delivery.insert_enabled);
        assert_eq!(delivery.paste_delay, Duration::from_millis(120));
    }

    /// `SystemDelivery` must be usable as `dyn TextDelivery`.
    #[test]
    fn system_delivery_is_object_safe() {
        let delivery: Box<dyn TextDelivery> =
            Box::new(SystemDelivery::from_config(&DeliveryConfig::default()));
        drop(delivery);
    }
}
