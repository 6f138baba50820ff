use crate::config::DEFAULT_HOTKEY;

use smart_dictation_core::{DEFAULT_POLL_INTERVAL, HotkeyBinding};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Push-to-talk key configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// One entry per hotkey: an accelerator like `ctrl+shift+Space`, or `fn`.
    #[serde(default = "default_bindings")]
    pub bindings: Vec<String>,

    /// Sampling interval for polled keys such as `fn`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            bindings: default_bindings(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl HotkeyConfig {
    /// Parsed bindings, duplicates removed in order.
    pub fn parsed(&self) -> Vec<HotkeyBinding> {
        let mut parsed: Vec<HotkeyBinding> = Vec::with_capacity(self.bindings.len());

        for raw in &self.bindings {
            let Ok(binding) = raw.parse::<HotkeyBinding>();
            if !parsed.contains(&binding) {
                parsed.push(binding);
            }
        }

        parsed
    }

    /// Polling interval for sensor keys.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_bindings() -> Vec<String> {
    vec![DEFAULT_HOTKEY.to_string()]
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}
