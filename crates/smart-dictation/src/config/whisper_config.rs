use smart_dictation_core::{AUTO_LANGUAGE, WhisperSettings};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whisper model configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhisperConfig {
    /// Path to the Whisper model file (e.g., ggml-base.en.bin).
    pub model_path: PathBuf,

    /// Use GPU for inference if a GPU backend was compiled in (Metal/Vulkan).
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,

    /// Spoken language code, or `auto` to detect it.
    #[serde(default = "default_language")]
    pub language: String,

    /// CPU threads used for decoding.
    #[serde(default = "default_threads")]
    pub threads: u16,
}

impl WhisperConfig {
    /// Config for a model at `model_path` with every other field defaulted.
    pub fn with_model(model_path: PathBuf) -> Self {
        Self {
            model_path,
            use_gpu: default_use_gpu(),
            language: default_language(),
            threads: default_threads(),
        }
    }

    /// Engine options for the transcriber.
    pub fn settings(&self) -> WhisperSettings {
        WhisperSettings {
            use_gpu: self.use_gpu,
            language: self.language.clone(),
            threads: self.threads,
        }
    }
}

fn default_use_gpu() -> bool {
    true
}

fn default_language() -> String {
    AUTO_LANGUAGE.to_string()
}

fn default_threads() -> u16 {
    6
}
