use crate::{AppError, AppResult};

use std::panic::Location;

use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use error_location::ErrorLocation;
use tracing::warn;

/// Returns the platform-specific paste modifier key.
///
/// macOS uses Cmd (Meta), Windows and Linux use Ctrl.
fn paste_modifier() -> Key {
    #[cfg(target_os = "macos")]
    {
        Key::Meta
    }
    #[cfg(not(target_os = "macos"))]
    {
        Key::Control
    }
}

/// Holds the paste modifier down for as long as it lives.
///
/// Owns the `Enigo` instance so the paste keystroke goes through the same
/// connection that pressed the modifier. Release on drop is best effort.
pub struct PasteModifierGuard {
    enigo: Enigo,
    modifier: Key,
}

impl PasteModifierGuard {
    /// Press the paste modifier.
    #[track_caller]
    pub(crate) fn press() -> AppResult<Self> {
        let modifier = paste_modifier();

        let mut enigo =
            Enigo::new(&Settings::default()).map_err(|e| AppError::AutoPasteFailed {
                reason: format!("Failed to create Enigo: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| AppError::AutoPasteFailed {
                reason: format!("Failed to press paste modifier: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self { enigo, modifier })
    }

    /// Click `key` while the modifier is held.
    #[track_caller]
    pub(crate) fn click(&mut self, key: char) -> AppResult<()> {
        self.enigo
            .key(Key::Unicode(key), Direction::Click)
            .map_err(|e| AppError::AutoPasteFailed {
                reason: format!("Failed to press {}: {}", key, e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

impl Drop for PasteModifierGuard {
    fn drop(&mut self) {
        if let Err(e) = self.enigo.key(self.modifier, Direction::Release) {
            warn!(error = %e, "Failed to release paste modifier");
        }
    }
}
