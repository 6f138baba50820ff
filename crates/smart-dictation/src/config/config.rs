//! Configuration management for smart-dictation.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, validation, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{BehaviourConfig, DuckingConfig, HotkeyConfig, RecordingConfig, WhisperConfig},
};

use smart_dictation_core::TRANSCRIPTION_SAMPLE_RATE;

use std::{fs, io::Write, panic::Location, path::PathBuf};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Whisper model configuration.
    pub whisper: WhisperConfig,
    /// Push-to-talk keys.
    #[serde(default)]
    pub hotkeys: HotkeyConfig,
    /// Capture format and duration limits.
    #[serde(default)]
    pub recording: RecordingConfig,
    /// Media player ducking.
    #[serde(default)]
    pub ducking: DuckingConfig,
    /// Application behavior settings.
    #[serde(default)]
    pub behavior: BehaviourConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    ///
    /// Note: This does NOT validate the model path exists. Call
    /// `validate_model_path()` before building the transcriber.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config = Self::from_toml_str(&contents)?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!("No config found, creating default");
            Self::create_default()
        }
    }

    /// Parse configuration text. Missing sections take their defaults.
    #[track_caller]
    pub fn from_toml_str(contents: &str) -> AppResult<Self> {
        toml::from_str(contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Check values the pipeline cannot run with.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |reason: String| AppError::ConfigError {
            reason,
            location: ErrorLocation::from(Location::caller()),
        };

        if self.recording.sample_rate != TRANSCRIPTION_SAMPLE_RATE {
            return Err(invalid(format!(
                "recording.sample_rate must be {}, got {}",
                TRANSCRIPTION_SAMPLE_RATE, self.recording.sample_rate
            )));
        }

        if self
            .recording
            .input_device
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(invalid(
                "recording.input_device must name a device or be omitted".to_string(),
            ));
        }

        if self.recording.chunk_frames == 0 {
            return Err(invalid("recording.chunk_frames must be positive".to_string()));
        }

        let min = self.recording.min_duration_secs;
        if !min.is_finite() || min < 0.0 {
            return Err(invalid(format!(
                "recording.min_duration_secs must be a non-negative number, got {}",
                min
            )));
        }

        if min >= self.recording.max_duration_secs as f64 {
            return Err(invalid(format!(
                "recording.min_duration_secs ({}) must be below max_duration_secs ({})",
                min, self.recording.max_duration_secs
            )));
        }

        if self.ducking.duck_volume > 100 {
            return Err(invalid(format!(
                "ducking.duck_volume must be 0-100, got {}",
                self.ducking.duck_volume
            )));
        }

        if self.hotkeys.poll_interval_ms == 0 {
            return Err(invalid("hotkeys.poll_interval_ms must be positive".to_string()));
        }

        let bindings = self.hotkeys.parsed();
        if bindings.is_empty() {
            return Err(invalid("hotkeys.bindings must name at least one key".to_string()));
        }

        if bindings
            .iter()
            .any(|b| b.accelerator().is_some_and(str::is_empty))
        {
            return Err(invalid("hotkeys.bindings contains an empty entry".to_string()));
        }

        Ok(())
    }

    /// Validate that the Whisper model file exists at the configured path.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn validate_model_path(&self) -> AppResult<()> {
        if !self.whisper.model_path.exists() {
            return Err(AppError::ConfigError {
                reason: format!(
                    "Whisper model not found at: {:?}. Download a model or set whisper.model_path.",
                    self.whisper.model_path
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Defaults for a model at `model_path`.
    pub fn with_model(model_path: PathBuf) -> Self {
        Self {
            whisper: WhisperConfig::with_model(model_path),
            hotkeys: HotkeyConfig::default(),
            recording: RecordingConfig::default(),
            ducking: DuckingConfig::default(),
            behavior: BehaviourConfig::default(),
        }
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "smart-dictation", "Smart-Dictation").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn create_default() -> AppResult<Self> {
        let proj_dirs = Self::project_dirs()?;
        let model_path = proj_dirs.data_dir().join("models").join("ggml-base.bin");

        let config = Self::with_model(model_path.clone());
        config.save()?;

        warn!(
            model_path = ?model_path,
            "Default config created. Whisper model must be downloaded before dictating."
        );

        Ok(config)
    }
}
