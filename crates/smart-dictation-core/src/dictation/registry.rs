//! Runs one independent dictation loop per configured hotkey.

use crate::{CoreResult, DictationCycle, HotkeySource};

use std::sync::Arc;

use tokio::{sync::watch, task::JoinSet};
use tracing::{Instrument, error, info, info_span, instrument, warn};

/// Maps each hotkey to the cycle it starts.
pub struct HotkeyRegistry<C> {
    entries: Vec<(HotkeySource, Arc<C>)>,
}

impl<C> Default for HotkeyRegistry<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C: DictationCycle> HotkeyRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route presses from `source` to `cycle`.
    pub fn register(&mut self, source: HotkeySource, cycle: Arc<C>) {
        info!(binding = %source.binding(), "Hotkey registered");
        self.entries.push((source, cycle));
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no binding is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every binding's loop until `shutdown` flips to `true`.
    ///
    /// A failed or panicking cycle ends only that cycle; its loop goes
    /// straight back to waiting for the next press.
    #[instrument(skip(self, shutdown), fields(bindings = self.entries.len()))]
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> CoreResult<()> {
        let mut loops = JoinSet::new();

        for (source, cycle) in self.entries {
            let span = info_span!("hotkey_loop", binding = %source.binding());
            loops.spawn(binding_loop(source, cycle, shutdown.clone()).instrument(span));
        }

        while let Some(result) = loops.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Hotkey loop task failed");
            }
        }

        info!("All hotkey loops stopped");
        Ok(())
    }
}

async fn binding_loop<C: DictationCycle>(
    mut source: HotkeySource,
    cycle: Arc<C>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let release = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            pressed = source.await_press() => match pressed {
                Ok(release) => release,
                Err(e) => {
                    error!(error = ?e, "Hotkey source closed");
                    break;
                }
            }
        };

        let cycle = Arc::clone(&cycle);
        let binding = source.binding().clone();
        let handle = tokio::spawn(
            async move { cycle.run(&binding, release).await }.in_current_span(),
        );

        match handle.await {
            Ok(Ok(outcome)) => info!(outcome = ?outcome, "Dictation cycle finished"),
            Ok(Err(e)) => warn!(error = ?e, "Dictation cycle failed"),
            Err(e) => error!(error = ?e, "Dictation cycle panicked"),
        }
    }

    info!("Hotkey loop stopped");
}
