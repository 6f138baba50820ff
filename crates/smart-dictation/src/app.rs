use crate::{AppResult, AppleScriptVolume, ClipboardSink, config::Config};

use smart_dictation_core::{
    CpalCaptureDevice, DictationOrchestrator, DuckGate, HotkeyRegistry, HotkeySource,
    SideEffectDucker, WhisperTranscriber,
};

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, instrument};

/// Orchestrator wired to the real devices.
pub(crate) type Orchestrator =
    DictationOrchestrator<CpalCaptureDevice, WhisperTranscriber, ClipboardSink, AppleScriptVolume>;

/// Dictation loops for every configured hotkey.
///
/// Runs on the coordination runtime thread. All bindings share one capture
/// device, one Whisper model, one clipboard sink and one duck gate.
pub struct App {
    registry: HotkeyRegistry<Orchestrator>,
}

impl App {
    /// Build one orchestrator per hotkey source.
    #[instrument(skip_all, fields(bindings = sources.len()))]
    pub(crate) fn new(
        config: &Config,
        sources: Vec<HotkeySource>,
        transcriber: WhisperTranscriber,
        sink: ClipboardSink,
    ) -> Self {
        let capture_device = Arc::new(CpalCaptureDevice::new(
            config.recording.input_device.clone(),
        ));
        let transcriber = Arc::new(transcriber);
        let sink = Arc::new(sink);
        let volume = Arc::new(AppleScriptVolume::new(&config.ducking.target_app));
        let gate = DuckGate::new();

        let ducker = if config.ducking.enabled {
            SideEffectDucker::new(
                volume,
                config.ducking.call_timeout(),
                config.ducking.duck_volume,
            )
        } else {
            SideEffectDucker::disabled(volume)
        };

        info!(
            input_device = capture_device.device_name().unwrap_or("default"),
            ducking = ducker.is_enabled(),
            target_app = %config.ducking.target_app,
            auto_paste = config.behavior.auto_paste,
            "Dictation pipeline configured"
        );

        let mut registry = HotkeyRegistry::new();

        for source in sources {
            let orchestrator = DictationOrchestrator::new(
                Arc::clone(&capture_device),
                Arc::clone(&transcriber),
                Arc::clone(&sink),
                ducker.clone(),
                gate.clone(),
            )
            .with_format(config.recording.format())
            .with_policy(config.recording.policy());

            registry.register(source, Arc::new(orchestrator));
        }

        Self { registry }
    }

    /// Run until `shutdown` flips or every hotkey listener is gone.
    #[instrument(skip_all)]
    pub(crate) async fn run(self, shutdown: watch::Receiver<bool>) -> AppResult<()> {
        info!(bindings = self.registry.len(), "Smart-Dictation starting");

        self.registry.run(shutdown).await?;

        info!("Smart-Dictation shut down successfully");
        Ok(())
    }
}
