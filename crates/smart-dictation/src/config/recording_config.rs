use smart_dictation_core::{
    CaptureFormat, CapturePolicy, DEFAULT_CHUNK_FRAMES, DEFAULT_MAX_DURATION,
    DEFAULT_MIN_DURATION, TRANSCRIPTION_SAMPLE_RATE,
};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Capture format and duration limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Input device name as the OS lists it. Unset means the default input
    /// device; an unknown name also falls back to it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,

    /// Capture rate in Hz. Whisper only accepts 16000.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames per chunk read; bounds how late capture stops after release.
    #[serde(default = "default_chunk_frames")]
    pub chunk_frames: usize,

    /// Shorter recordings are discarded as accidental taps.
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: f64,

    /// Recordings are cut off at this length.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            sample_rate: default_sample_rate(),
            chunk_frames: default_chunk_frames(),
            min_duration_secs: default_min_duration_secs(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

impl RecordingConfig {
    /// Mono capture format at the configured rate.
    pub fn format(&self) -> CaptureFormat {
        CaptureFormat {
            sample_rate: self.sample_rate,
            channels: 1,
            chunk_frames: self.chunk_frames,
        }
    }

    /// Duration limits. Call after validation; negative or non-finite
    /// minimums fall back to zero.
    pub fn policy(&self) -> CapturePolicy {
        CapturePolicy {
            min_duration: Duration::try_from_secs_f64(self.min_duration_secs)
                .unwrap_or(Duration::ZERO),
            max_duration: Duration::from_secs(self.max_duration_secs),
        }
    }
}

fn default_sample_rate() -> u32 {
    TRANSCRIPTION_SAMPLE_RATE
}

fn default_chunk_frames() -> usize {
    DEFAULT_CHUNK_FRAMES
}

fn default_min_duration_secs() -> f64 {
    DEFAULT_MIN_DURATION.as_secs_f64()
}

fn default_max_duration_secs() -> u64 {
    DEFAULT_MAX_DURATION.as_secs()
}
