use error_location::ErrorLocation;
use thiserror::Error;

/// Dictation pipeline errors with source location tracking.
///
/// A short recording is not an error; it surfaces as
/// [`CaptureOutcome::Rejected`](crate::CaptureOutcome::Rejected).
#[derive(Error, Debug)]
pub enum DictationError {
    /// No audio input device found.
    #[error("No microphone found {location}")]
    NoMicrophoneFound {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Whisper model file not found at specified path.
    #[error("Model not found at path: {path:?} {location}")]
    ModelNotFound {
        /// Path to the missing model file.
        path: std::path::PathBuf,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Transcription process failed.
    #[error("Transcription failed: {source} {location}")]
    TranscriptionFailed {
        /// Underlying error from the transcription engine.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No audio data captured or provided.
    #[error("No audio captured {location}")]
    NoAudioCaptured {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio device operation failed.
    #[error("Audio device error: {reason} {location}")]
    DeviceError {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Output sink could not deliver the transcription.
    #[error("Delivery failed: {source} {location}")]
    DeliveryFailed {
        /// Underlying error from the output sink.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Remote volume control call failed or timed out.
    #[error("Volume control error: {reason} {location}")]
    VolumeControl {
        /// Description of the failed call.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The listener feeding a hotkey's latches has gone away.
    #[error("Hotkey listener for {binding} disconnected {location}")]
    HotkeyListenerGone {
        /// Binding whose listener disconnected.
        binding: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Failed to start a listener thread.
    #[error("Failed to spawn {name} thread: {source} {location}")]
    ThreadSpawn {
        /// Thread name.
        name: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`DictationError`].
pub type Result<T> = std::result::Result<T, DictationError>;
