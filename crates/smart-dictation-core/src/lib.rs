//! Smart-dictation core library.
//!
//! Push-to-talk dictation: a hotkey press starts recording, the release
//! stops it, and the recording is transcribed with Whisper and handed to an
//! output sink. While recording, a third-party player can be ducked and is
//! restored as soon as the key is released, without waiting for the
//! transcription.
//!
//! # Example
//!
//! ```no_run
//! use smart_dictation_core::{
//!     CoreResult, CpalCaptureDevice, DictationOrchestrator, DuckGate, HotkeyBinding,
//!     HotkeyRegistry, OutputSink, SideEffectDucker, VolumeControl, WhisperSettings,
//!     WhisperTranscriber, hotkey_signal,
//! };
//!
//! use std::sync::Arc;
//!
//! async fn run<O: OutputSink, V: VolumeControl>(sink: O, volume: V) -> CoreResult<()> {
//!     let transcriber = WhisperTranscriber::new("models/ggml-base.en.bin", WhisperSettings::default())?;
//!     let orchestrator = DictationOrchestrator::new(
//!         Arc::new(CpalCaptureDevice::new(None)),
//!         Arc::new(transcriber),
//!         Arc::new(sink),
//!         SideEffectDucker::disabled(Arc::new(volume)),
//!         DuckGate::new(),
//!     );
//!
//!     let binding = HotkeyBinding::Combo {
//!         accelerator: "ctrl+shift+Space".to_string(),
//!     };
//!     let (trigger, source) = hotkey_signal(binding);
//!     // Hand `trigger` to a listener thread that calls `press()` / `release()`.
//!     # drop(trigger);
//!
//!     let mut registry = HotkeyRegistry::new();
//!     registry.register(source, Arc::new(orchestrator));
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     registry.run(shutdown_rx).await
//! }
//! ```

mod audio;
mod dictation;
mod error;
mod hotkey;

pub use {
    audio::{AUTO_LANGUAGE, CpalCaptureDevice, CpalCaptureStream, WhisperSettings, WhisperTranscriber},
    dictation::{
        CaptureDevice, CaptureFormat, CaptureOutcome, CapturePolicy, CaptureStream, CycleOutcome,
        CyclePhase, DEFAULT_CALL_TIMEOUT, DEFAULT_CHUNK_FRAMES, DEFAULT_MAX_DURATION,
        DEFAULT_MIN_DURATION, DictationCycle, DictationOrchestrator, DuckGate, DuckState,
        HotkeyRegistry, OutputSink, RecordingSession, SAMPLE_WIDTH, SampleBuffer, SessionState,
        SideEffectDucker, TRANSCRIPTION_SAMPLE_RATE, TranscriptionService, VolumeControl,
    },
    error::{DictationError, Result as CoreResult},
    hotkey::{
        DEFAULT_POLL_INTERVAL, Edge, EdgeDetector, HotkeyBinding, HotkeySource, HotkeyTrigger,
        KeyStateProbe, LatchState, ReleaseSignal, SensorKey, SensorPoller, hotkey_signal,
    },
};
