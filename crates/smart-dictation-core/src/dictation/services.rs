//! Seams to the collaborators a dictation cycle drives.
//!
//! Concrete implementations live next to the hardware they talk to: the
//! cpal capture device and Whisper engine in this crate's `audio` module,
//! the clipboard sink and AppleScript volume control in the binary.

use crate::{CaptureFormat, CoreResult, SampleBuffer};

use std::future::Future;

/// Opens capture streams.
pub trait CaptureDevice: Send + Sync + 'static {
    /// Open stream type. Dropping it closes the device.
    type Stream: CaptureStream;

    /// Open the device for capture in `format`.
    fn open(&self, format: &CaptureFormat) -> impl Future<Output = CoreResult<Self::Stream>> + Send;
}

/// An open capture stream.
pub trait CaptureStream: Send {
    /// Read the next chunk of `chunk_frames` frames.
    fn read_chunk(&mut self) -> impl Future<Output = CoreResult<Vec<i16>>> + Send;
}

/// Turns captured audio into text. May take seconds.
pub trait TranscriptionService: Send + Sync + 'static {
    /// Transcribe a finalized buffer.
    fn transcribe(&self, buffer: SampleBuffer) -> impl Future<Output = CoreResult<String>> + Send;
}

/// Receives transcribed text.
pub trait OutputSink: Send + Sync + 'static {
    /// Deliver text to the user.
    fn deliver(&self, text: &str) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Remote control over a third-party application's playback volume.
///
/// Every call is a best-effort remote call and may fail.
pub trait VolumeControl: Send + Sync + 'static {
    /// Whether the target application is running.
    fn is_target_running(&self) -> impl Future<Output = CoreResult<bool>> + Send;

    /// Whether the target application is currently playing.
    fn is_target_playing(&self) -> impl Future<Output = CoreResult<bool>> + Send;

    /// Current volume, 0 to 100.
    fn volume(&self) -> impl Future<Output = CoreResult<u8>> + Send;

    /// Set the volume, clamped to 0 to 100.
    fn set_volume(&self, volume: u8) -> impl Future<Output = CoreResult<()>> + Send;
}
