use std::time::Duration;

/// Sample rate expected by the transcription path.
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16_000;

/// Bytes per captured sample (signed 16-bit).
pub const SAMPLE_WIDTH: u16 = 2;

/// Frames read per chunk by default (64 ms at 16 kHz).
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// Shape of the audio delivered by a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Frames returned by each chunk read.
    pub chunk_frames: usize,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            sample_rate: TRANSCRIPTION_SAMPLE_RATE,
            channels: 1,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }
}

impl CaptureFormat {
    /// Nominal duration of one chunk. Upper bound on stop latency.
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_frames as f64 / self.sample_rate as f64)
    }

    /// Bytes per second of captured audio.
    pub fn byte_rate(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.channels) * u64::from(SAMPLE_WIDTH)
    }

    /// Audio duration represented by `byte_len` bytes.
    pub fn duration_of(&self, byte_len: usize) -> Duration {
        Duration::from_secs_f64(byte_len as f64 / self.byte_rate() as f64)
    }
}

/// Finalized, immutable capture result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Vec<i16>,
    format: CaptureFormat,
}

impl SampleBuffer {
    /// Wrap finalized samples.
    pub fn new(samples: Vec<i16>, format: CaptureFormat) -> Self {
        Self { samples, format }
    }

    /// Raw interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Format the samples were captured in.
    pub fn format(&self) -> CaptureFormat {
        self.format
    }

    /// Size of the buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * usize::from(SAMPLE_WIDTH)
    }

    /// Audio duration, derived from the byte count.
    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.byte_len())
    }

    /// Whether no samples were captured.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples normalized to `[-1.0, 1.0]` for the Whisper engine.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| f32::from(s) / f32::from(i16::MAX))
            .collect()
    }
}
