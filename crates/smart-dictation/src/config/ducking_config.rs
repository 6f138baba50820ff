use crate::config::DEFAULT_TARGET_APP;

use smart_dictation_core::DEFAULT_CALL_TIMEOUT;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Volume ducking of a media player while recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuckingConfig {
    /// Whether to duck at all. The AppleScript control only exists on macOS.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Application whose volume is lowered.
    #[serde(default = "default_target_app")]
    pub target_app: String,

    /// Volume applied while recording, 0 to 100.
    #[serde(default)]
    pub duck_volume: u8,

    /// Bound on each AppleScript call.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for DuckingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            target_app: default_target_app(),
            duck_volume: 0,
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl DuckingConfig {
    /// Bound on each volume call.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn default_enabled() -> bool {
    cfg!(target_os = "macos")
}

fn default_target_app() -> String {
    DEFAULT_TARGET_APP.to_string()
}

fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT.as_millis() as u64
}
