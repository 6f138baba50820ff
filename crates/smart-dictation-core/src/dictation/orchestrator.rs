//! One dictation cycle: duck, capture, transcribe, deliver, restore.
//!
//! The restore runs on its own task, started as soon as the duck finishes.
//! It fires on release, concurrently with capture finalization and
//! transcription, so the target application's audio comes back without
//! waiting for Whisper. The cycle still waits for that task before it
//! returns, whichever way it ends.

use crate::{
    CaptureDevice, CaptureFormat, CaptureOutcome, CapturePolicy, CoreResult, DuckState,
    HotkeyBinding, OutputSink, RecordingSession, ReleaseSignal, SideEffectDucker,
    TranscriptionService, VolumeControl,
};

use std::{fmt, future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, OwnedMutexGuard, oneshot},
    task::JoinHandle,
};
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

/// A registry callback: runs one full cycle for a pressed binding.
pub trait DictationCycle: Send + Sync + 'static {
    /// Run one cycle. Returns once the cycle is back to idle.
    fn run(
        &self,
        binding: &HotkeyBinding,
        release: ReleaseSignal,
    ) -> impl Future<Output = CoreResult<CycleOutcome>> + Send;
}

/// How a cycle that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Text reached the output sink.
    Delivered {
        /// Length of the delivered text in bytes.
        text_len: usize,
    },
    /// Transcription produced no text; nothing delivered.
    Empty,
    /// Recording was too short and never transcribed.
    Rejected {
        /// Length of the discarded recording.
        duration: Duration,
    },
}

/// Cycle phases, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Waiting for a press.
    Idle,
    /// Querying and muting the target application.
    Ducking,
    /// Recording until release.
    Capturing,
    /// Recording discarded as too short.
    Rejected,
    /// Recording finalized.
    Finalizing,
    /// Waiting on the transcription service.
    Transcribing,
    /// Handing text to the output sink.
    Delivering,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "Idle",
            CyclePhase::Ducking => "Ducking",
            CyclePhase::Capturing => "Capturing",
            CyclePhase::Rejected => "Rejected",
            CyclePhase::Finalizing => "Finalizing",
            CyclePhase::Transcribing => "Transcribing",
            CyclePhase::Delivering => "Delivering",
        };
        write!(f, "{}", name)
    }
}

/// Process-wide lock around the duck, capture and restore window.
///
/// The target's volume is a single external resource. Holding this gate
/// from before the duck until after the restore keeps two bindings that
/// are held at the same time from saving each other's ducked volume.
#[derive(Debug, Clone, Default)]
pub struct DuckGate(Arc<Mutex<()>>);

impl DuckGate {
    /// Create an unlocked gate.
    pub fn new() -> Self {
        Self::default()
    }

    async fn enter(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.0).lock_owned().await
    }
}

/// Composes capture, ducking, transcription and delivery into cycles.
pub struct DictationOrchestrator<D, T, O, V> {
    capture_device: Arc<D>,
    transcriber: Arc<T>,
    sink: Arc<O>,
    ducker: SideEffectDucker<V>,
    gate: DuckGate,
    format: CaptureFormat,
    policy: CapturePolicy,
}

impl<D, T, O, V> DictationOrchestrator<D, T, O, V>
where
    D: CaptureDevice,
    T: TranscriptionService,
    O: OutputSink,
    V: VolumeControl,
{
    /// Create an orchestrator. Orchestrators that must not interleave
    /// their duck windows share one `gate`.
    pub fn new(
        capture_device: Arc<D>,
        transcriber: Arc<T>,
        sink: Arc<O>,
        ducker: SideEffectDucker<V>,
        gate: DuckGate,
    ) -> Self {
        Self {
            capture_device,
            transcriber,
            sink,
            ducker,
            gate,
            format: CaptureFormat::default(),
            policy: CapturePolicy::default(),
        }
    }

    /// Override the capture format.
    pub fn with_format(mut self, format: CaptureFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the duration policy.
    pub fn with_policy(mut self, policy: CapturePolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn run_cycle(&self, release: ReleaseSignal) -> CoreResult<CycleOutcome> {
        let permit = self.gate.enter().await;

        enter(CyclePhase::Ducking);
        let duck = self.ducker.duck_if_needed().await;

        let restore = RestoreBranch::spawn(self.ducker.clone(), duck, release.clone(), permit);

        let result = self.record_and_transcribe(&release).await;

        let duck = restore.finish(&self.ducker).await;
        debug!(
            was_playing = duck.was_playing(),
            restored = duck.restored(),
            "Duck window closed"
        );

        enter(CyclePhase::Idle);
        result
    }

    async fn record_and_transcribe(&self, release: &ReleaseSignal) -> CoreResult<CycleOutcome> {
        enter(CyclePhase::Capturing);
        let mut session = RecordingSession::new(self.format, self.policy);

        let buffer = match session.capture(self.capture_device.as_ref(), release).await? {
            CaptureOutcome::Rejected { duration } => {
                enter(CyclePhase::Rejected);
                return Ok(CycleOutcome::Rejected { duration });
            }
            CaptureOutcome::Captured(buffer) => buffer,
        };

        enter(CyclePhase::Finalizing);
        let recorded = session.started_at().elapsed();
        info!(
            duration_ms = buffer.duration().as_millis(),
            held_ms = recorded.as_millis(),
            "Recording finalized"
        );

        enter(CyclePhase::Transcribing);
        let start = std::time::Instant::now();
        let text = self.transcriber.transcribe(buffer).await?;
        info!(
            duration_ms = start.elapsed().as_millis(),
            text_len = text.len(),
            "Transcription complete"
        );

        let text = text.trim();
        if text.is_empty() {
            info!("Transcription was blank, nothing to deliver");
            return Ok(CycleOutcome::Empty);
        }

        enter(CyclePhase::Delivering);
        self.sink.deliver(text).await?;

        Ok(CycleOutcome::Delivered {
            text_len: text.len(),
        })
    }
}

impl<D, T, O, V> DictationCycle for DictationOrchestrator<D, T, O, V>
where
    D: CaptureDevice,
    T: TranscriptionService,
    O: OutputSink,
    V: VolumeControl,
{
    fn run(
        &self,
        binding: &HotkeyBinding,
        release: ReleaseSignal,
    ) -> impl Future<Output = CoreResult<CycleOutcome>> + Send {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("dictation_cycle", cycle_id = %cycle_id, binding = %binding);
        self.run_cycle(release).instrument(span)
    }
}

fn enter(phase: CyclePhase) {
    debug!(phase = %phase, "Cycle phase");
}

/// The release-reaction task and the means to end it.
///
/// The task owns a clone of the duck state and the gate permit. It restores as soon
/// as the release is set, or as soon as the cycle signals it is finished,
/// whichever happens first. Dropping the branch without calling
/// [`finish`](Self::finish) drops the trigger, which also fires the
/// restore, so a cancelled cycle still puts the volume back.
struct RestoreBranch {
    done_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    duck: DuckState,
}

impl RestoreBranch {
    fn spawn<V: VolumeControl>(
        ducker: SideEffectDucker<V>,
        duck: DuckState,
        mut release: ReleaseSignal,
        permit: OwnedMutexGuard<()>,
    ) -> Self {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let task_duck = duck.clone();

        let handle = tokio::spawn(
            async move {
                tokio::select! {
                    _ = release.wait() => debug!("Release observed, restoring"),
                    _ = done_rx => debug!("Cycle ended before release, restoring"),
                }
                ducker.restore(&task_duck).await;
                drop(permit);
            }
            .in_current_span(),
        );

        Self {
            done_tx: Some(done_tx),
            handle: Some(handle),
            duck,
        }
    }

    /// Fire the restore if it has not fired yet and wait for it.
    async fn finish<V: VolumeControl>(mut self, ducker: &SideEffectDucker<V>) -> DuckState {
        if let Some(done_tx) = self.done_tx.take() {
            let _ = done_tx.send(());
        }

        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            // The shared flag stops this from repeating a restore the task
            // already started.
            error!(error = ?e, "Restore task failed, restoring inline");
            ducker.restore(&self.duck).await;
        }

        self.duck
    }
}
