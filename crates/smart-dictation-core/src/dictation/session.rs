use crate::{
    CaptureDevice, CaptureFormat, CaptureStream, CoreResult, DictationError, ReleaseSignal,
    SampleBuffer,
};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Recordings shorter than this are accidental taps.
pub const DEFAULT_MIN_DURATION: Duration = Duration::from_secs(1);

/// Capture is finalized early once a recording reaches this length.
///
/// **Memory footprint at max duration:**
/// - 16,000 Hz * 300s * 2 bytes/i16 = ~9.6MB
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(5 * 60);

/// Lower bound for the per-chunk stall timeout.
const MIN_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Chunks that may be missed before the device counts as stalled.
const STALL_CHUNKS: u32 = 16;

/// Duration limits applied to every recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePolicy {
    /// Shorter recordings are rejected without transcription.
    pub min_duration: Duration,
    /// Longer recordings are cut off and finalized.
    pub max_duration: Duration,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }
}

/// Result of a capture that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Recording long enough to transcribe.
    Captured(SampleBuffer),
    /// Recording discarded by the minimum-duration policy.
    Rejected {
        /// How long the discarded recording was.
        duration: Duration,
    },
}

/// Lifecycle of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Reading chunks from the device.
    Capturing,
    /// Buffer handed off for transcription.
    Finalized,
    /// Buffer discarded as too short.
    Rejected,
}

/// One recording, owned by the cycle that created it.
#[derive(Debug)]
pub struct RecordingSession {
    format: CaptureFormat,
    policy: CapturePolicy,
    started_at: Instant,
    samples: Vec<i16>,
    state: SessionState,
}

impl RecordingSession {
    /// Create a session in the `Capturing` state.
    pub fn new(format: CaptureFormat, policy: CapturePolicy) -> Self {
        Self {
            format,
            policy,
            started_at: Instant::now(),
            samples: Vec::new(),
            state: SessionState::Capturing,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// When the session was created.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Record from `device` until `release` is set.
    ///
    /// The release signal is checked before every chunk read, so capture
    /// stops at most one chunk after the physical release. The stream is
    /// dropped, closing the device, on every return path.
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened, a read fails, or the
    /// device stops delivering audio.
    #[instrument(skip(self, device, release), fields(gesture = release.gesture()))]
    pub async fn capture<D: CaptureDevice>(
        &mut self,
        device: &D,
        release: &ReleaseSignal,
    ) -> CoreResult<CaptureOutcome> {
        let mut stream = device.open(&self.format).await?;
        info!("Recording started, waiting for release");

        if release.is_set() {
            warn!("Release was already set at recording start");
        }

        let read_timeout = self.read_timeout();
        let max_samples = self.max_samples();

        while !release.is_set() {
            let chunk = tokio::time::timeout(read_timeout, stream.read_chunk())
                .await
                .map_err(|_| DictationError::DeviceError {
                    reason: format!("No audio received for {}ms", read_timeout.as_millis()),
                    location: ErrorLocation::from(Location::caller()),
                })??;

            self.samples.extend_from_slice(&chunk);

            if self.samples.len() >= max_samples {
                warn!(
                    max_secs = self.policy.max_duration.as_secs(),
                    "Maximum recording length reached, finalizing"
                );
                break;
            }
        }

        drop(stream);

        Ok(self.finish())
    }

    fn finish(&mut self) -> CaptureOutcome {
        let samples = std::mem::take(&mut self.samples);
        let buffer = SampleBuffer::new(samples, self.format);
        let duration = buffer.duration();

        debug!(
            byte_len = buffer.byte_len(),
            duration_ms = duration.as_millis(),
            "Recording stopped"
        );

        if duration < self.policy.min_duration {
            self.state = SessionState::Rejected;
            info!(
                duration_ms = duration.as_millis(),
                min_ms = self.policy.min_duration.as_millis(),
                "Recording too short, discarding"
            );
            return CaptureOutcome::Rejected { duration };
        }

        self.state = SessionState::Finalized;
        CaptureOutcome::Captured(buffer)
    }

    fn read_timeout(&self) -> Duration {
        (self.format.chunk_duration() * STALL_CHUNKS).max(MIN_READ_TIMEOUT)
    }

    fn max_samples(&self) -> usize {
        let seconds = self.policy.max_duration.as_secs_f64();
        (seconds * f64::from(self.format.sample_rate) * f64::from(self.format.channels)) as usize
    }
}
