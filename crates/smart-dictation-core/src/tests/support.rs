//! In-memory collaborators for driving cycles without hardware.

use crate::{
    CaptureDevice, CaptureFormat, CaptureStream, CoreResult, DictationError, DictationOrchestrator,
    DuckGate, HotkeyBinding, OutputSink, ReleaseSignal, SampleBuffer, SideEffectDucker,
    TranscriptionService, VolumeControl, hotkey_signal,
};

use std::{
    collections::VecDeque,
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::{sync::watch, task::JoinHandle, time::Instant};

/// Nominal duration of a default 1024-frame chunk at 16kHz.
pub(crate) const CHUNK: Duration = Duration::from_millis(64);

pub(crate) fn combo() -> HotkeyBinding {
    HotkeyBinding::Combo {
        accelerator: "ctrl+shift+Space".to_string(),
    }
}

/// Press the default combo now and release it after `hold`.
///
/// The returned handle resolves to the instant the release was latched.
#[allow(clippy::unwrap_used)]
pub(crate) async fn hold_for(hold: Duration) -> (ReleaseSignal, JoinHandle<Instant>) {
    let (trigger, mut source) = hotkey_signal(combo());
    trigger.press();
    let release = source.await_press().await.unwrap();

    let releaser = tokio::spawn(async move {
        tokio::time::sleep(hold).await;
        let at = Instant::now();
        trigger.release();
        at
    });

    (release, releaser)
}

/// Poll `condition` every 10ms for up to 10s.
pub(crate) async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..1000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn device_error(reason: &str) -> DictationError {
    DictationError::DeviceError {
        reason: reason.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Delivers a chunk of constant samples every `chunk_delay`.
pub(crate) struct FakeCaptureDevice {
    chunk_delay: Duration,
    fail_open: bool,
    fail_after_reads: Option<usize>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    closed_at: Arc<Mutex<Option<Instant>>>,
}

impl FakeCaptureDevice {
    pub(crate) fn new(chunk_delay: Duration) -> Self {
        Self {
            chunk_delay,
            fail_open: false,
            fail_after_reads: None,
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            closed_at: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn realtime() -> Self {
        Self::new(CHUNK)
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::realtime()
        }
    }

    pub(crate) fn failing_after(reads: usize) -> Self {
        Self {
            fail_after_reads: Some(reads),
            ..Self::realtime()
        }
    }

    pub(crate) fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn closed_at(&self) -> Option<Instant> {
        *lock(&self.closed_at)
    }
}

impl CaptureDevice for FakeCaptureDevice {
    type Stream = FakeCaptureStream;

    async fn open(&self, format: &CaptureFormat) -> CoreResult<FakeCaptureStream> {
        if self.fail_open {
            return Err(device_error("device unplugged"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(FakeCaptureStream {
            chunk_frames: format.chunk_frames,
            chunk_delay: self.chunk_delay,
            reads: 0,
            fail_after_reads: self.fail_after_reads,
            closed: Arc::clone(&self.closed),
            closed_at: Arc::clone(&self.closed_at),
        })
    }
}

pub(crate) struct FakeCaptureStream {
    chunk_frames: usize,
    chunk_delay: Duration,
    reads: usize,
    fail_after_reads: Option<usize>,
    closed: Arc<AtomicUsize>,
    closed_at: Arc<Mutex<Option<Instant>>>,
}

impl CaptureStream for FakeCaptureStream {
    async fn read_chunk(&mut self) -> CoreResult<Vec<i16>> {
        tokio::time::sleep(self.chunk_delay).await;

        if self.fail_after_reads.is_some_and(|limit| self.reads >= limit) {
            return Err(device_error("read failed"));
        }
        self.reads += 1;

        Ok(vec![1000; self.chunk_frames])
    }
}

impl Drop for FakeCaptureStream {
    fn drop(&mut self) {
        *lock(&self.closed_at) = Some(Instant::now());
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Transcription
// ---------------------------------------------------------------------------

/// Replies from a script, then with `fallback` once the script runs out.
pub(crate) struct FakeTranscriber {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    wait_for_volume: Option<(watch::Receiver<u8>, u8)>,
    calls: AtomicUsize,
    durations: Mutex<Vec<Duration>>,
}

impl FakeTranscriber {
    pub(crate) fn returning(text: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: text.to_string(),
            wait_for_volume: None,
            calls: AtomicUsize::new(0),
            durations: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_once_then(text: &str) -> Self {
        let transcriber = Self::returning(text);
        lock(&transcriber.script).push_back(Err("model crashed".to_string()));
        transcriber
    }

    /// Only answers once the target volume reads `volume`, proving the
    /// restore ran while transcription was still in flight.
    pub(crate) fn waiting_for_volume(text: &str, volume: &FakeVolume, expected: u8) -> Self {
        Self {
            wait_for_volume: Some((volume.subscribe(), expected)),
            ..Self::returning(text)
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn durations(&self) -> Vec<Duration> {
        lock(&self.durations).clone()
    }
}

impl TranscriptionService for FakeTranscriber {
    async fn transcribe(&self, buffer: SampleBuffer) -> CoreResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.durations).push(buffer.duration());

        if let Some((rx, expected)) = &self.wait_for_volume {
            let mut rx = rx.clone();
            let expected = *expected;
            let restored =
                tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| *v == expected))
                    .await
                    .map(|r| r.is_ok())
                    .unwrap_or(false);
            if !restored {
                return Err(DictationError::TranscriptionFailed {
                    source: "volume was not restored during transcription".into(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        let next = lock(&self.script).pop_front();
        match next {
            Some(Err(reason)) => Err(DictationError::TranscriptionFailed {
                source: reason.into(),
                location: ErrorLocation::from(Location::caller()),
            }),
            Some(Ok(text)) => Ok(text),
            None => Ok(self.fallback.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct FakeSink {
    fail: bool,
    delivered: Mutex<Vec<String>>,
}

impl FakeSink {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn delivered(&self) -> Vec<String> {
        lock(&self.delivered).clone()
    }
}

impl OutputSink for FakeSink {
    async fn deliver(&self, text: &str) -> CoreResult<()> {
        if self.fail {
            return Err(DictationError::DeliveryFailed {
                source: "clipboard unavailable".into(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        lock(&self.delivered).push(text.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Volume
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VolumeBehaviour {
    Normal,
    QueriesFail,
    VolumeReadFails,
    Hangs,
    /// Applies a non-zero volume, then panics.
    PanicsOnRestore,
}

/// A player whose volume is observable through a watch channel.
pub(crate) struct FakeVolume {
    running: bool,
    playing: bool,
    behaviour: VolumeBehaviour,
    volume: watch::Sender<u8>,
    sets: Mutex<Vec<u8>>,
}

impl FakeVolume {
    pub(crate) fn playing_at(volume: u8) -> Self {
        Self {
            running: true,
            playing: true,
            behaviour: VolumeBehaviour::Normal,
            volume: watch::channel(volume).0,
            sets: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn paused_at(volume: u8) -> Self {
        Self {
            playing: false,
            ..Self::playing_at(volume)
        }
    }

    pub(crate) fn not_running() -> Self {
        Self {
            running: false,
            playing: false,
            ..Self::playing_at(50)
        }
    }

    pub(crate) fn with_behaviour(behaviour: VolumeBehaviour) -> Self {
        Self {
            behaviour,
            ..Self::playing_at(40)
        }
    }

    pub(crate) fn current(&self) -> u8 {
        *self.volume.borrow()
    }

    pub(crate) fn sets(&self) -> Vec<u8> {
        lock(&self.sets).clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u8> {
        self.volume.subscribe()
    }

    async fn remote_call(&self) -> CoreResult<()> {
        match self.behaviour {
            VolumeBehaviour::Hangs => std::future::pending().await,
            VolumeBehaviour::QueriesFail => Err(DictationError::VolumeControl {
                reason: "osascript exited with 1".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            _ => Ok(()),
        }
    }
}

impl VolumeControl for FakeVolume {
    async fn is_target_running(&self) -> CoreResult<bool> {
        self.remote_call().await?;
        Ok(self.running)
    }

    async fn is_target_playing(&self) -> CoreResult<bool> {
        self.remote_call().await?;
        Ok(self.playing)
    }

    async fn volume(&self) -> CoreResult<u8> {
        self.remote_call().await?;
        if self.behaviour == VolumeBehaviour::VolumeReadFails {
            return Err(DictationError::VolumeControl {
                reason: "unparseable volume".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(*self.volume.borrow())
    }

    #[allow(clippy::panic)]
    async fn set_volume(&self, volume: u8) -> CoreResult<()> {
        self.remote_call().await?;
        let volume = volume.min(100);
        lock(&self.sets).push(volume);
        self.volume.send_replace(volume);
        if self.behaviour == VolumeBehaviour::PanicsOnRestore && volume > 0 {
            panic!("player crashed after restoring volume");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub(crate) type FakeOrchestrator =
    DictationOrchestrator<FakeCaptureDevice, FakeTranscriber, FakeSink, FakeVolume>;

pub(crate) struct Rig {
    pub(crate) device: Arc<FakeCaptureDevice>,
    pub(crate) transcriber: Arc<FakeTranscriber>,
    pub(crate) sink: Arc<FakeSink>,
    pub(crate) volume: Arc<FakeVolume>,
}

impl Rig {
    pub(crate) fn new(
        device: FakeCaptureDevice,
        transcriber: FakeTranscriber,
        sink: FakeSink,
        volume: FakeVolume,
    ) -> Self {
        Self {
            device: Arc::new(device),
            transcriber: Arc::new(transcriber),
            sink: Arc::new(sink),
            volume: Arc::new(volume),
        }
    }

    pub(crate) fn orchestrator(&self, gate: DuckGate) -> FakeOrchestrator {
        DictationOrchestrator::new(
            Arc::clone(&self.device),
            Arc::clone(&self.transcriber),
            Arc::clone(&self.sink),
            SideEffectDucker::new(Arc::clone(&self.volume), Duration::from_millis(500), 0),
            gate,
        )
    }
}
