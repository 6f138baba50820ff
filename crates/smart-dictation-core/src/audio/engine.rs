use crate::{CoreResult, DictationError, SampleBuffer, TRANSCRIPTION_SAMPLE_RATE, TranscriptionService};

use std::{
    panic::Location,
    path::Path,
    sync::{Arc, Mutex},
};

use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Language value that lets Whisper detect the spoken language.
pub const AUTO_LANGUAGE: &str = "auto";

/// Inference options for the Whisper engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhisperSettings {
    /// Use a GPU backend if one was compiled in (Metal/Vulkan).
    pub use_gpu: bool,
    /// Spoken language code, or [`AUTO_LANGUAGE`].
    pub language: String,
    /// CPU threads used for decoding.
    pub threads: u16,
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            use_gpu: true,
            language: AUTO_LANGUAGE.to_string(),
            threads: 6,
        }
    }
}

pub struct SttEngine {
    ctx: WhisperContext,
    settings: WhisperSettings,
}

impl SttEngine {
    #[track_caller]
    #[instrument(skip(model_path))]
    pub fn new<P: AsRef<Path>>(model_path: P, settings: WhisperSettings) -> CoreResult<Self> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(DictationError::ModelNotFound {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(settings.use_gpu);

        let ctx = WhisperContext::new_with_params(
            path.to_str().ok_or(DictationError::ModelNotFound {
                path: path.to_path_buf(),
                location: ErrorLocation::from(Location::caller()),
            })?,
            ctx_params,
        )
        .map_err(|e| DictationError::TranscriptionFailed {
            source: Box::new(e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(model_path = ?path, use_gpu = settings.use_gpu, "Whisper model loaded");

        Ok(Self { ctx, settings })
    }

    #[track_caller]
    #[instrument(skip(self, samples))]
    pub fn transcribe(&mut self, samples: &[f32]) -> CoreResult<String> {
        if samples.is_empty() {
            return Err(DictationError::NoAudioCaptured {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_language(Some(self.settings.language.as_str()));
        params.set_n_threads(i32::from(self.settings.threads));
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);
        params.set_suppress_nst(true);

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| DictationError::TranscriptionFailed {
                source: Box::new(e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        state
            .full(params, samples)
            .map_err(|e| DictationError::TranscriptionFailed {
                source: Box::new(e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let num_segments = state.full_n_segments();

        let mut segments = Vec::with_capacity(num_segments.max(0) as usize);

        for i in 0..num_segments {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| DictationError::TranscriptionFailed {
                    source: format!("Failed to get segment {}", i).into(),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            segments.push(segment.to_string().trim().to_string());
        }

        let transcription = segments.join(" ").trim().to_string();

        debug!(
            sample_count = samples.len(),
            segment_count = num_segments,
            text_len = transcription.len(),
            "Transcription complete"
        );

        Ok(transcription)
    }
}

/// [`TranscriptionService`] backed by a local Whisper model.
///
/// Inference is CPU-bound and takes seconds, so it runs on the blocking
/// pool. The engine sits behind a mutex because Whisper state is created
/// per call but the context must not be used concurrently.
#[derive(Clone)]
pub struct WhisperTranscriber {
    engine: Arc<Mutex<SttEngine>>,
}

impl WhisperTranscriber {
    /// Load the model. This is slow; do it once at startup.
    ///
    /// # Errors
    ///
    /// Returns error if the model file doesn't exist or fails to load.
    #[track_caller]
    pub fn new<P: AsRef<Path>>(model_path: P, settings: WhisperSettings) -> CoreResult<Self> {
        let engine = SttEngine::new(model_path, settings)?;
        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
        })
    }
}

impl TranscriptionService for WhisperTranscriber {
    #[instrument(skip(self, buffer), fields(duration_ms = buffer.duration().as_millis()))]
    async fn transcribe(&self, buffer: SampleBuffer) -> CoreResult<String> {
        let format = buffer.format();
        if format.sample_rate != TRANSCRIPTION_SAMPLE_RATE || format.channels != 1 {
            return Err(DictationError::TranscriptionFailed {
                source: format!(
                    "Whisper needs 16kHz mono, got {} Hz x {}",
                    format.sample_rate, format.channels
                )
                .into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let engine = Arc::clone(&self.engine);
        let samples = buffer.to_f32();

        tokio::task::spawn_blocking(move || {
            // A poisoned mutex means a previous inference panicked; the
            // context itself is still usable.
            let mut engine = engine.lock().unwrap_or_else(|e| {
                error!("Whisper engine lock poisoned, recovering: {}", e);
                e.into_inner()
            });
            engine.transcribe(&samples)
        })
        .await
        .map_err(|e| DictationError::TranscriptionFailed {
            source: Box::new(e),
            location: ErrorLocation::from(Location::caller()),
        })?
    }
}
