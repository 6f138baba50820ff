//! Lowers a third-party application's playback volume while recording.

use crate::{CoreResult, DictationError, VolumeControl};

use std::{
    future::Future,
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Default bound on each remote volume call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// What a duck did, and whether it has been undone.
///
/// Clones share one `restored` flag, which only ever goes from `false` to
/// `true`, so a restore through any clone is seen by all of them.
#[derive(Debug, Clone, Default)]
pub struct DuckState {
    was_playing: bool,
    saved_volume: Option<u8>,
    restored: Arc<AtomicBool>,
}

impl DuckState {
    /// Whether the target was playing when the duck ran.
    pub fn was_playing(&self) -> bool {
        self.was_playing
    }

    /// Volume read before muting, if it could be read.
    pub fn saved_volume(&self) -> Option<u8> {
        self.saved_volume
    }

    /// Whether restore has run.
    pub fn restored(&self) -> bool {
        self.restored.load(Ordering::Acquire)
    }

    /// Whether restore still has work to do.
    pub fn needs_restore(&self) -> bool {
        self.was_playing && !self.restored()
    }
}

/// Ducks and restores the target application around a recording window.
///
/// Every remote call is bounded by `call_timeout`. Failures never abort
/// the dictation cycle: a failed query counts as "not playing".
pub struct SideEffectDucker<V> {
    control: Arc<V>,
    call_timeout: Duration,
    duck_volume: u8,
    enabled: bool,
}

impl<V> Clone for SideEffectDucker<V> {
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
            call_timeout: self.call_timeout,
            duck_volume: self.duck_volume,
            enabled: self.enabled,
        }
    }
}

impl<V: VolumeControl> SideEffectDucker<V> {
    /// Create an enabled ducker that mutes the target to `duck_volume`.
    pub fn new(control: Arc<V>, call_timeout: Duration, duck_volume: u8) -> Self {
        Self {
            control,
            call_timeout,
            duck_volume: duck_volume.min(100),
            enabled: true,
        }
    }

    /// Create a ducker that never touches the target.
    pub fn disabled(control: Arc<V>) -> Self {
        Self {
            control,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            duck_volume: 0,
            enabled: false,
        }
    }

    /// Whether ducking is turned on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mute the target if it is playing, remembering its volume.
    #[instrument(skip(self))]
    pub async fn duck_if_needed(&self) -> DuckState {
        let mut state = DuckState::default();

        if !self.enabled {
            return state;
        }

        if !self.is_playing().await {
            debug!("Target not playing, skipping duck");
            return state;
        }
        state.was_playing = true;

        let volume = match self.call("get volume", self.control.volume()).await {
            Ok(volume) => volume,
            Err(e) => {
                warn!(error = ?e, "Could not read target volume, leaving it alone");
                return state;
            }
        };
        state.saved_volume = Some(volume);

        if let Err(e) = self
            .call("set volume", self.control.set_volume(self.duck_volume))
            .await
        {
            warn!(error = ?e, "Failed to duck target volume");
        } else {
            info!(saved_volume = volume, duck_volume = self.duck_volume, "Target ducked");
        }

        state
    }

    /// Put the saved volume back. Runs at most once per [`DuckState`] and
    /// its clones.
    #[instrument(skip(self))]
    pub async fn restore(&self, state: &DuckState) {
        if !state.was_playing || state.restored.swap(true, Ordering::AcqRel) {
            return;
        }

        let Some(volume) = state.saved_volume else {
            return;
        };

        match self.call("set volume", self.control.set_volume(volume)).await {
            Ok(()) => info!(volume, "Target volume restored"),
            Err(e) => warn!(error = ?e, volume, "Failed to restore target volume"),
        }
    }

    async fn is_playing(&self) -> bool {
        match self.call("is running", self.control.is_target_running()).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(error = ?e, "Target running query failed, treating as not playing");
                return false;
            }
        }

        match self.call("is playing", self.control.is_target_playing()).await {
            Ok(playing) => playing,
            Err(e) => {
                warn!(error = ?e, "Target playing query failed, treating as not playing");
                false
            }
        }
    }

    async fn call<T>(
        &self,
        what: &str,
        fut: impl Future<Output = CoreResult<T>>,
    ) -> CoreResult<T> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| DictationError::VolumeControl {
                reason: format!("{} timed out after {}ms", what, self.call_timeout.as_millis()),
                location: ErrorLocation::from(Location::caller()),
            })?
    }
}
