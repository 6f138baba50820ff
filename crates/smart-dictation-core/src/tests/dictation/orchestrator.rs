use crate::{
    CycleOutcome, DictationCycle, DictationError, DuckGate, hotkey_signal,
    tests::support::{
        CHUNK, FakeCaptureDevice, FakeSink, FakeTranscriber, FakeVolume, Rig, VolumeBehaviour, combo,
        hold_for,
    },
};

use std::time::Duration;

/// WHAT: A 2s hold ducks, records, restores, transcribes and delivers
/// WHY: The full happy path of one push-to-talk cycle
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_two_second_hold_when_cycle_runs_then_text_delivered_and_volume_restored() {
    // Given: Music at 40 and a transcriber that only answers after the
    // volume is back at 40
    let volume = FakeVolume::playing_at(40);
    let transcriber = FakeTranscriber::waiting_for_volume("hello world", &volume, 40);
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        transcriber,
        FakeSink::default(),
        volume,
    );
    let orchestrator = rig.orchestrator(DuckGate::new());
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;

    // When: Running the cycle
    let outcome = orchestrator.run(&combo(), release).await.unwrap();

    // Then: Delivered, restored before transcription returned
    assert_eq!(outcome, CycleOutcome::Delivered { text_len: 11 });
    assert_eq!(rig.sink.delivered(), vec!["hello world".to_string()]);
    assert_eq!(rig.volume.sets(), vec![0, 40]);
    assert_eq!(rig.volume.current(), 40);

    let durations = rig.transcriber.durations();
    assert_eq!(durations.len(), 1);
    assert!(durations[0] >= Duration::from_secs(2));
    assert!(durations[0] <= Duration::from_secs(2) + CHUNK * 2);
}

/// WHAT: A short tap is rejected without transcription
/// WHY: Taps must still restore the volume they ducked
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_short_tap_when_cycle_runs_then_rejected_and_volume_restored() {
    // Given: Music at 40 and a 300ms tap
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("never"),
        FakeSink::default(),
        FakeVolume::playing_at(40),
    );
    let orchestrator = rig.orchestrator(DuckGate::new());
    let (release, _releaser) = hold_for(Duration::from_millis(300)).await;

    // When: Running the cycle
    let outcome = orchestrator.run(&combo(), release).await.unwrap();

    // Then: Rejected, never transcribed, volume back
    assert!(matches!(outcome, CycleOutcome::Rejected { .. }));
    assert_eq!(rig.transcriber.calls(), 0);
    assert!(rig.sink.delivered().is_empty());
    assert_eq!(rig.volume.sets(), vec![0, 40]);
}

/// WHAT: A transcription failure fails the cycle but still restores
/// WHY: The user's music must come back even when Whisper errors
#[tokio::test(start_paused = true)]
async fn given_transcription_failure_when_cycle_runs_then_error_and_volume_restored() {
    // Given: A transcriber that fails
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::failing_once_then("unused"),
        FakeSink::default(),
        FakeVolume::playing_at(40),
    );
    let orchestrator = rig.orchestrator(DuckGate::new());
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;

    // When: Running the cycle
    let result = orchestrator.run(&combo(), release).await;

    // Then: Error, nothing delivered, volume back
    assert!(matches!(
        result,
        Err(DictationError::TranscriptionFailed { .. })
    ));
    assert!(rig.sink.delivered().is_empty());
    assert_eq!(rig.volume.sets(), vec![0, 40]);
}

/// WHAT: A restore task that dies after restoring is not repeated inline
/// WHY: Setting the volume twice would clobber a change the user made since
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_restore_task_panics_after_restoring_when_cycle_ends_then_no_second_restore() {
    // Given: A player that crashes right after its volume is put back
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("hello"),
        FakeSink::default(),
        FakeVolume::with_behaviour(VolumeBehaviour::PanicsOnRestore),
    );
    let gate = DuckGate::new();
    let orchestrator = rig.orchestrator(gate.clone());
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;

    // When: Running the cycle
    let outcome = orchestrator.run(&combo(), release).await.unwrap();

    // Then: Delivered, with exactly one duck and one restore
    assert_eq!(outcome, CycleOutcome::Delivered { text_len: 5 });
    assert_eq!(rig.volume.sets(), vec![0, 40]);
    assert_eq!(rig.volume.current(), 40);

    // And the dying task still released the gate
    let other = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("never"),
        FakeSink::default(),
        FakeVolume::paused_at(40),
    );
    let (next_release, _releaser) = hold_for(Duration::from_millis(300)).await;
    let next = tokio::time::timeout(
        Duration::from_secs(10),
        other.orchestrator(gate).run(&combo(), next_release),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(matches!(next, CycleOutcome::Rejected { .. }));
}

/// WHAT: A capture failure while the key is held restores and frees the gate
/// WHY: The restore must not wait for a release that may come much later
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_unavailable_device_when_key_still_held_then_restored_and_gate_freed() {
    // Given: A device that fails to open, and a key that stays down
    let rig = Rig::new(
        FakeCaptureDevice::unavailable(),
        FakeTranscriber::returning("unused"),
        FakeSink::default(),
        FakeVolume::playing_at(40),
    );
    let gate = DuckGate::new();
    let orchestrator = rig.orchestrator(gate.clone());
    let (trigger, mut source) = hotkey_signal(combo());
    trigger.press();
    let release = source.await_press().await.unwrap();

    // When: Running the cycle
    let result = orchestrator.run(&combo(), release.clone()).await;

    // Then: Error, restored while still held
    assert!(matches!(result, Err(DictationError::DeviceError { .. })));
    assert!(!release.is_set());
    assert_eq!(rig.volume.sets(), vec![0, 40]);

    // And another cycle on the same gate can start
    let other = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("next"),
        FakeSink::default(),
        FakeVolume::paused_at(40),
    );
    let (next_release, _releaser) = hold_for(Duration::from_secs(2)).await;
    let next = tokio::time::timeout(
        Duration::from_secs(10),
        other.orchestrator(gate).run(&combo(), next_release),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(next, CycleOutcome::Delivered { text_len: 4 });
}

/// WHAT: Nothing is ducked when the target is not playing
/// WHY: The cycle must not change the volume of a paused player
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_paused_target_when_cycle_runs_then_no_volume_calls() {
    // Given: A paused player
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("note to self"),
        FakeSink::default(),
        FakeVolume::paused_at(40),
    );
    let orchestrator = rig.orchestrator(DuckGate::new());
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;

    // When: Running the cycle
    let outcome = orchestrator.run(&combo(), release).await.unwrap();

    // Then: Delivered without touching the volume
    assert_eq!(outcome, CycleOutcome::Delivered { text_len: 12 });
    assert!(rig.volume.sets().is_empty());
}

/// WHAT: A blank transcript delivers nothing
/// WHY: Pasting whitespace would clobber the clipboard for no reason
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_blank_transcript_when_cycle_runs_then_empty_outcome() {
    // Given: Whisper hears only silence
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("   \n"),
        FakeSink::default(),
        FakeVolume::paused_at(40),
    );
    let orchestrator = rig.orchestrator(DuckGate::new());
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;

    // When: Running the cycle
    let outcome = orchestrator.run(&combo(), release).await.unwrap();

    // Then: Empty, nothing delivered
    assert_eq!(outcome, CycleOutcome::Empty);
    assert!(rig.sink.delivered().is_empty());
}

/// WHAT: Delivered text is trimmed
/// WHY: Whisper segments carry leading spaces
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_padded_transcript_when_cycle_runs_then_trimmed_text_delivered() {
    // Given: Whisper output with surrounding whitespace
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("  buy milk \n"),
        FakeSink::default(),
        FakeVolume::paused_at(40),
    );
    let orchestrator = rig.orchestrator(DuckGate::new());
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;

    // When: Running the cycle
    orchestrator.run(&combo(), release).await.unwrap();

    // Then: Trimmed
    assert_eq!(rig.sink.delivered(), vec!["buy milk".to_string()]);
}

/// WHAT: A delivery failure fails the cycle after restoring
/// WHY: Clipboard errors must surface, not vanish
#[tokio::test(start_paused = true)]
async fn given_failing_sink_when_cycle_runs_then_delivery_failed() {
    // Given: A sink that cannot deliver
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("hello"),
        FakeSink::failing(),
        FakeVolume::playing_at(40),
    );
    let orchestrator = rig.orchestrator(DuckGate::new());
    let (release, _releaser) = hold_for(Duration::from_secs(2)).await;

    // When: Running the cycle
    let result = orchestrator.run(&combo(), release).await;

    // Then: Delivery error, volume back
    assert!(matches!(result, Err(DictationError::DeliveryFailed { .. })));
    assert_eq!(rig.volume.sets(), vec![0, 40]);
}

/// WHAT: Overlapping holds on two bindings do not corrupt the saved volume
/// WHY: Without the gate the second duck saves the first duck's 0 and
/// restores the player to silence
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_overlapping_bindings_when_sharing_gate_then_volume_restored_to_original() {
    // Given: Two orchestrators on one player and one gate
    let rig = Rig::new(
        FakeCaptureDevice::realtime(),
        FakeTranscriber::returning("text"),
        FakeSink::default(),
        FakeVolume::playing_at(40),
    );
    let gate = DuckGate::new();
    let first = rig.orchestrator(gate.clone());
    let second = rig.orchestrator(gate);

    // When: The second binding is pressed while the first is held
    let (first_release, _first) = hold_for(Duration::from_secs(2)).await;
    let first_cycle = tokio::spawn(async move { first.run(&combo(), first_release).await });

    tokio::time::sleep(Duration::from_millis(500)).await;
    let (second_release, _second) = hold_for(Duration::from_secs(3)).await;
    let second_cycle = tokio::spawn(async move { second.run(&combo(), second_release).await });

    first_cycle.await.unwrap().unwrap();
    second_cycle.await.unwrap().unwrap();

    // Then: Duck windows ran one after the other, ending at 40
    assert_eq!(rig.volume.sets(), vec![0, 40, 0, 40]);
    assert_eq!(rig.volume.current(), 40);
}
