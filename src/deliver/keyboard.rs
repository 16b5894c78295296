//! Paste-keystroke simulation backed by the `enigo` crate.
//!
//! | Platform | Shortcut |
//! |----------|----------|
//! | macOS    | ⌘V (Meta + V) |
//! | Windows / Linux | Ctrl+V |

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use super::DeliveryError;

#[cfg(target_os = "macos")]
const PASTE_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const PASTE_MODIFIER: Key = Key::Control;

/// Send the system paste shortcut to the currently focused window.
///
/// A new [`Enigo`] instance is created per call because `Enigo` is not
/// `Send` and the handle is cheap to construct.
///
/// # Errors
///
/// Returns [`DeliveryError::KeySimulation`] if the enigo backend cannot be
/// initialised or any key event fails to be delivered.
pub fn simulate_paste() -> Result<(), DeliveryError> {
    let mut enigo = Enigo::new(&Settings::default())
        .map_err(|e| DeliveryError::KeySimulation(e.to_string()))?;

    chord(&mut enigo, PASTE_MODIFIER, 'v')
}

/// Press `modifier`, click the `key` character, release `modifier`.
fn chord(enigo: &mut Enigo, modifier: Key, key: char) -> Result<(), DeliveryError> {
    let sim = |e: enigo::InputError| DeliveryError::KeySimulation(e.to_string());

    enigo.key(modifier, Direction::Press).map_err(sim)?;
    let result = enigo.key(Key::Unicode(key), Direction::Click).map_err(sim);
    // Always try to release the modifier, even when the click failed.
    let release = enigo.key(modifier, Direction::Release).map_err(sim);
    result.and(release)
}
