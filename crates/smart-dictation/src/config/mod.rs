mod behaviour_config;
#[allow(clippy::module_inception)]
mod config;
mod ducking_config;
mod hotkey_config;
mod recording_config;
mod whisper_config;

pub(crate) use {
    behaviour_config::BehaviourConfig, config::Config, ducking_config::DuckingConfig,
    hotkey_config::HotkeyConfig, recording_config::RecordingConfig, whisper_config::WhisperConfig,
};

pub(crate) const DEFAULT_AUTO_PASTE: bool = false;
pub(crate) const DEFAULT_HOTKEY: &str = "ctrl+shift+Space";
pub(crate) const DEFAULT_TARGET_APP: &str = "Music";

pub(crate) fn default_auto_paste() -> bool {
    DEFAULT_AUTO_PASTE
}
