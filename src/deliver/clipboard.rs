//! Clipboard writer backed by the `arboard` crate.
//!
//! A short-lived [`arboard::Clipboard`] handle is created per call rather
//! than shared, because `arboard::Clipboard` is not `Send` on all platforms
//! and the handle is cheap to create.

use arboard::Clipboard;

use super::DeliveryError;

/// Write `text` into the system clipboard, replacing whatever was there.
///
/// The replaced content is intentionally not saved: the delivered text must
/// stay available for a manual paste if the automatic insertion fails.
///
/// # Errors
///
/// Returns [`DeliveryError::ClipboardAccess`] if the OS clipboard cannot be
/// opened, or [`DeliveryError::ClipboardSet`] if writing fails.
pub fn set_clipboard(text: &str) -> Result<(), DeliveryError> {
    let mut clipboard =
        Clipboard::new().map_err(|e| DeliveryError::ClipboardAccess(e.to_string()))?;
    clipboard
        .set_text(text)
        .map_err(|e| DeliveryError::ClipboardSet(e.to_string()))
}
