pub(crate) mod capture;
mod engine;
mod resampler;

pub(crate) use {engine::SttEngine, resampler::Resampler};

pub use {
    capture::{CpalCaptureDevice, CpalCaptureStream},
    engine::{AUTO_LANGUAGE, WhisperSettings, WhisperTranscriber},
};
