//! Polling hotkey source for keys that produce no usable events.
//!
//! A dedicated OS thread samples a [`KeyStateProbe`] at a fixed interval
//! and latches only the edges into a [`HotkeyTrigger`].

use crate::{CoreResult, DictationError, HotkeyTrigger};

use std::{
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use error_location::ErrorLocation;
use tracing::{debug, info, warn};

/// Default sampling interval for sensor keys.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reads the instantaneous state of one key.
pub trait KeyStateProbe: Send + 'static {
    /// Whether the key is currently held down.
    fn is_pressed(&self) -> bool;
}

/// Transition between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Released to pressed.
    Rising,
    /// Pressed to released.
    Falling,
}

/// Compares each sample against the previous one.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    last: bool,
}

impl EdgeDetector {
    /// Feed one sample; returns the edge if the state changed.
    pub fn sample(&mut self, current: bool) -> Option<Edge> {
        if current == self.last {
            return None;
        }
        self.last = current;
        Some(if current { Edge::Rising } else { Edge::Falling })
    }
}

/// Handle to a running poll thread. Stops and joins the thread on drop.
pub struct SensorPoller {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SensorPoller {
    /// Start polling `probe` every `interval`, latching edges into `trigger`.
    #[track_caller]
    pub fn spawn<P: KeyStateProbe>(
        probe: P,
        interval: Duration,
        trigger: HotkeyTrigger,
    ) -> CoreResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let name = format!("sensor-poll-{}", trigger.binding());

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let mut detector = EdgeDetector::default();

                while thread_running.load(Ordering::Acquire) {
                    match detector.sample(probe.is_pressed()) {
                        Some(Edge::Rising) => trigger.press(),
                        Some(Edge::Falling) => trigger.release(),
                        None => {}
                    }
                    std::thread::sleep(interval);
                }

                debug!(binding = %trigger.binding(), "Sensor poll thread exiting");
            })
            .map_err(|source| DictationError::ThreadSpawn {
                name,
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(interval_ms = interval.as_millis(), "Sensor poller started");

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop polling and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Sensor poll thread panicked");
        }
    }
}

impl Drop for SensorPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
