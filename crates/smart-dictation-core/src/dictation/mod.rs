mod ducker;
mod orchestrator;
mod registry;
mod sample_buffer;
mod services;
mod session;

pub use {
    ducker::{DEFAULT_CALL_TIMEOUT, DuckState, SideEffectDucker},
    orchestrator::{CycleOutcome, CyclePhase, DictationCycle, DictationOrchestrator, DuckGate},
    registry::HotkeyRegistry,
    sample_buffer::{
        CaptureFormat, DEFAULT_CHUNK_FRAMES, SAMPLE_WIDTH, SampleBuffer,
        TRANSCRIPTION_SAMPLE_RATE,
    },
    services::{CaptureDevice, CaptureStream, OutputSink, TranscriptionService, VolumeControl},
    session::{
        CaptureOutcome, CapturePolicy, DEFAULT_MAX_DURATION, DEFAULT_MIN_DURATION,
        RecordingSession, SessionState,
    },
};
