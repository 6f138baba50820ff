use crate::{
    CaptureFormat, CaptureOutcome, CapturePolicy, DictationError, RecordingSession, SessionState,
    hotkey_signal,
    tests::support::{CHUNK, FakeCaptureDevice, combo, hold_for},
};

use std::time::Duration;

fn session() -> RecordingSession {
    RecordingSession::new(CaptureFormat::default(), CapturePolicy::default())
}

/// WHAT: A short hold is rejected
/// WHY: Accidental taps must not reach Whisper
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_hold_under_minimum_when_capturing_then_rejected() {
    // Given: A 300ms hold
    let device = FakeCaptureDevice::realtime();
    let (release, _releaser) = hold_for(Duration::from_millis(300)).await;
    let mut session = session();

    // When: Capturing
    let outcome = session.capture(&device, &release).await.unwrap();

    // Then: Rejected with the recorded length, stream opened and closed once
    assert!(matches!(
        outcome,
        CaptureOutcome::Rejected { duration }
            if duration >= Duration::from_millis(300)
                && duration <= Duration::from_millis(300) + CHUNK
    ));
    assert_eq!(session.state(), SessionState::Rejected);
    assert_eq!(device.opened_count(), 1);
    assert_eq!(device.closed_count(), 1);
}

/// WHAT: A 2s hold captures about 2s of audio
/// WHY: Capture must follow the key, not a fixed window
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_two_second_hold_when_capturing_then_captured() {
    // Given: A 2s hold
    let device = FakeCaptureDevice::realtime();
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;
    let mut session = session();

    // When: Capturing
    let outcome = session.capture(&device, &release).await.unwrap();

    // Then: Finalized with the held length, within one chunk
    assert!(matches!(
        &outcome,
        CaptureOutcome::Captured(buffer)
            if buffer.duration() >= Duration::from_secs(2)
                && buffer.duration() <= Duration::from_secs(2) + CHUNK
    ));
    assert_eq!(session.state(), SessionState::Finalized);
}

/// WHAT: Capture stops within one chunk of the release
/// WHY: The user's next words must not bleed into this recording
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_release_when_capturing_then_stream_closed_within_one_chunk() {
    // Given: A 2s hold
    let device = FakeCaptureDevice::realtime();
    let (release, releaser) = hold_for(Duration::from_secs(2)).await;
    let mut session = session();

    // When: Capturing to completion
    session.capture(&device, &release).await.unwrap();

    // Then: The device closed no later than one chunk after release
    let released_at = releaser.await.unwrap();
    let closed_at = device.closed_at().unwrap();
    assert!(closed_at >= released_at);
    assert!(closed_at - released_at <= CHUNK);
}

/// WHAT: An unavailable device fails the capture
/// WHY: The cycle must surface the error instead of recording silence
#[tokio::test(start_paused = true)]
async fn given_unavailable_device_when_capturing_then_device_error() {
    // Given: A device that fails to open
    let device = FakeCaptureDevice::unavailable();
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;
    let mut session = session();

    // When: Capturing
    let result = session.capture(&device, &release).await;

    // Then: Device error, nothing ever opened
    assert!(matches!(result, Err(DictationError::DeviceError { .. })));
    assert_eq!(session.state(), SessionState::Capturing);
    assert_eq!(device.opened_count(), 0);
    assert_eq!(device.closed_count(), 0);
}

/// WHAT: A read failure closes the stream
/// WHY: A failed recording must not hold the microphone open
#[tokio::test(start_paused = true)]
async fn given_read_failure_when_capturing_then_stream_closed() {
    // Given: A device that fails on its fourth read
    let device = FakeCaptureDevice::failing_after(3);
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;
    let mut session = session();

    // When: Capturing
    let result = session.capture(&device, &release).await;

    // Then: Error and exactly one close
    assert!(matches!(result, Err(DictationError::DeviceError { .. })));
    assert_eq!(device.closed_count(), 1);
}

/// WHAT: Recording is cut at the maximum duration
/// WHY: A stuck key must not record forever
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_key_never_released_when_capturing_then_cut_at_maximum() {
    // Given: A 1s limit and a key that stays down
    let device = FakeCaptureDevice::realtime();
    let (trigger, mut source) = hotkey_signal(combo());
    trigger.press();
    let release = source.await_press().await.unwrap();
    let policy = CapturePolicy {
        min_duration: Duration::from_millis(500),
        max_duration: Duration::from_secs(1),
    };
    let mut session = RecordingSession::new(CaptureFormat::default(), policy);

    // When: Capturing
    let outcome = session.capture(&device, &release).await.unwrap();

    // Then: Finalized at the limit, key still held
    assert!(matches!(
        &outcome,
        CaptureOutcome::Captured(buffer)
            if buffer.duration() >= Duration::from_secs(1)
                && buffer.duration() <= Duration::from_secs(1) + CHUNK
    ));
    assert!(!release.is_set());
    assert_eq!(device.closed_count(), 1);
}

/// WHAT: A device that stops delivering audio times out
/// WHY: A stalled driver must not hang the cycle
#[tokio::test(start_paused = true)]
async fn given_stalled_device_when_capturing_then_device_error() {
    // Given: A device that takes 10s per chunk
    let device = FakeCaptureDevice::new(Duration::from_secs(10));
    let (release, _releaser) = hold_for(Duration::from_secs(30)).await;
    let mut session = session();
    let start = tokio::time::Instant::now();

    // When: Capturing
    let result = session.capture(&device, &release).await;

    // Then: Fails after the stall timeout, not the full hold
    assert!(matches!(result, Err(DictationError::DeviceError { .. })));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(device.closed_count(), 1);
}
