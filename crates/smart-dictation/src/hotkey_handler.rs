//! Global hotkey registration and the listener thread for combo bindings.
//!
//! Combos are registered with `global-hotkey` on the main thread, whose
//! `tao` event loop pumps the OS messages hotkey delivery depends on. A
//! dedicated thread blocks on the global event channel and latches each
//! press and release into the trigger registered under that hotkey id.

use crate::{AppError, AppResult};

use smart_dictation_core::HotkeyTrigger;

use std::{collections::HashMap, panic::Location, str::FromStr};

use error_location::ErrorLocation;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState, hotkey::HotKey};
use tracing::{debug, info, instrument, trace, warn};

/// Owns the OS hotkey registrations for every combo binding.
///
/// Must live on the main thread for as long as the hotkeys should stay
/// registered; dropping it unregisters them.
pub struct HotkeyHandler {
    manager: GlobalHotKeyManager,
    triggers: HashMap<u32, HotkeyTrigger>,
}

impl HotkeyHandler {
    /// Create the hotkey manager. Call on the main thread.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to create manager: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self {
            manager,
            triggers: HashMap::new(),
        })
    }

    /// Register the combo behind `trigger`.
    #[track_caller]
    #[instrument(skip(self, trigger), fields(binding = %trigger.binding()))]
    pub fn register(&mut self, trigger: HotkeyTrigger) -> AppResult<()> {
        let accelerator = trigger.binding().accelerator().ok_or_else(|| {
            AppError::HotkeyRegistrationFailed {
                reason: format!("{} is not a key combination", trigger.binding()),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let hotkey = parse_accelerator(accelerator)?;

        self.manager
            .register(hotkey)
            .map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to register {}: {}", accelerator, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(hotkey = accelerator, id = hotkey.id(), "Global hotkey registered");
        self.triggers.insert(hotkey.id(), trigger);

        Ok(())
    }

    /// Number of registered combos.
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    /// Whether no combo is registered.
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Start the thread that forwards hotkey events to the triggers.
    ///
    /// The thread blocks on the global event channel for the rest of the
    /// process; it is not joined on shutdown.
    #[track_caller]
    pub fn spawn_listener(&self) -> AppResult<()> {
        let triggers = self.triggers.clone();
        let receiver = GlobalHotKeyEvent::receiver().clone();

        std::thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                while let Ok(event) = receiver.recv() {
                    dispatch(&triggers, event);
                }
                debug!("Hotkey event channel closed");
            })
            .map_err(|e| AppError::IoError {
                source: e,
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(hotkeys = self.len(), "Hotkey listener started");
        Ok(())
    }
}

/// Parse an accelerator such as `ctrl+shift+Space`.
#[track_caller]
pub(crate) fn parse_accelerator(accelerator: &str) -> AppResult<HotKey> {
    HotKey::from_str(accelerator).map_err(|e| AppError::HotkeyRegistrationFailed {
        reason: format!("Invalid hotkey {:?}: {}", accelerator, e),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Latch one hotkey event into the trigger registered under its id.
pub(crate) fn dispatch(triggers: &HashMap<u32, HotkeyTrigger>, event: GlobalHotKeyEvent) {
    let Some(trigger) = triggers.get(&event.id) else {
        warn!(id = event.id, "Event for unknown hotkey");
        return;
    };

    trace!(binding = %trigger.binding(), state = ?event.state, "Hotkey event");

    match event.state {
        HotKeyState::Pressed => trigger.press(),
        HotKeyState::Released => trigger.release(),
    }
}
