//! Press/release latches shared between listener threads and the
//! coordination runtime.
//!
//! Listener threads only ever hold a [`HotkeyTrigger`] and can only set
//! latches through it. The runtime side holds the [`HotkeySource`] and the
//! per-gesture [`ReleaseSignal`]s it hands out. The two sides are joined by
//! a `tokio::sync::watch` channel, whose sender is usable from plain OS
//! threads without a runtime.

use crate::{CoreResult, DictationError, HotkeyBinding};

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Latch snapshot for one binding.
///
/// `gesture` advances on every accepted press, which resets both latches
/// for the new gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatchState {
    /// Number of accepted presses since startup.
    pub gesture: u64,
    /// Press latch for the current gesture.
    pub pressed: bool,
    /// Release latch for the current gesture.
    pub released: bool,
}

impl LatchState {
    /// Whether the current gesture is still being held.
    pub fn is_held(&self) -> bool {
        self.pressed && !self.released
    }
}

/// Create the latch pair for a binding.
pub fn hotkey_signal(binding: HotkeyBinding) -> (HotkeyTrigger, HotkeySource) {
    let (tx, rx) = watch::channel(LatchState::default());

    let trigger = HotkeyTrigger {
        binding: binding.clone(),
        tx: Arc::new(tx),
    };

    let source = HotkeySource {
        binding,
        rx,
        observed: 0,
    };

    (trigger, source)
}

/// Producer half of a binding's latches, owned by listener threads.
#[derive(Debug, Clone)]
pub struct HotkeyTrigger {
    binding: HotkeyBinding,
    tx: Arc<watch::Sender<LatchState>>,
}

impl HotkeyTrigger {
    /// Latch a gesture start. A press while already held is ignored.
    pub fn press(&self) {
        let accepted = self.tx.send_if_modified(|state| {
            if state.is_held() {
                return false;
            }
            state.gesture += 1;
            state.pressed = true;
            state.released = false;
            true
        });

        if accepted {
            debug!(binding = %self.binding, "Hotkey pressed");
        } else {
            trace!(binding = %self.binding, "Ignoring repeated press");
        }
    }

    /// Latch a gesture end. A release without a held press is ignored.
    pub fn release(&self) {
        let accepted = self.tx.send_if_modified(|state| {
            if !state.is_held() {
                return false;
            }
            state.released = true;
            true
        });

        if accepted {
            debug!(binding = %self.binding, "Hotkey released");
        } else {
            trace!(binding = %self.binding, "Ignoring release without press");
        }
    }

    /// Binding this trigger feeds.
    pub fn binding(&self) -> &HotkeyBinding {
        &self.binding
    }
}

/// Consumer half of a binding's latches.
///
/// Only gestures that are still held when the source looks at them start a
/// cycle. A gesture that began and ended while the owner was busy with a
/// previous cycle is dropped instead of being replayed as a stale tap.
#[derive(Debug)]
pub struct HotkeySource {
    binding: HotkeyBinding,
    rx: watch::Receiver<LatchState>,
    observed: u64,
}

impl HotkeySource {
    /// Suspend until the next press and return the release signal for that
    /// gesture.
    pub async fn await_press(&mut self) -> CoreResult<ReleaseSignal> {
        let observed = self.observed;
        let location = ErrorLocation::from(Location::caller());

        let gesture = {
            let state = self
                .rx
                .wait_for(|state| state.gesture > observed && state.is_held())
                .await
                .map_err(|_| DictationError::HotkeyListenerGone {
                    binding: self.binding.to_string(),
                    location,
                })?;
            state.gesture
        };

        self.observed = gesture;

        Ok(ReleaseSignal {
            rx: self.rx.clone(),
            gesture,
        })
    }

    /// Suspend until the most recently observed gesture ends.
    ///
    /// Before any press has been observed this waits for the first gesture
    /// to end, not merely to start.
    pub async fn await_release(&mut self) {
        if self.observed == 0 {
            // A second gesture implies the first one has ended.
            let first = self
                .rx
                .wait_for(|state| state.gesture > 1 || (state.gesture == 1 && state.released))
                .await
                .map(|state| state.gesture);

            // A closed channel means the listener is gone; treat as released.
            if let Ok(gesture) = first {
                self.observed = gesture;
            }
            return;
        }

        let mut release = ReleaseSignal {
            rx: self.rx.clone(),
            gesture: self.observed,
        };
        release.wait().await;
    }

    /// Binding this source observes.
    pub fn binding(&self) -> &HotkeyBinding {
        &self.binding
    }
}

/// Release latch for one specific gesture.
///
/// Considered set once that gesture's release has latched, once a newer
/// gesture has started, or once the listener has disconnected.
#[derive(Debug, Clone)]
pub struct ReleaseSignal {
    rx: watch::Receiver<LatchState>,
    gesture: u64,
}

impl ReleaseSignal {
    /// Non-blocking check, used between chunk reads.
    pub fn is_set(&self) -> bool {
        if self.rx.has_changed().is_err() {
            return true;
        }
        let state = self.rx.borrow();
        Self::ended(&state, self.gesture)
    }

    /// Suspend until the release is set.
    pub async fn wait(&mut self) {
        let gesture = self.gesture;
        // A closed channel means the listener is gone; treat as released.
        let _ = self
            .rx
            .wait_for(|state| Self::ended(state, gesture))
            .await;
    }

    /// Gesture number this signal belongs to.
    pub fn gesture(&self) -> u64 {
        self.gesture
    }

    fn ended(state: &LatchState, gesture: u64) -> bool {
        state.gesture != gesture || state.released
    }
}
