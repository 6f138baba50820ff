mod binding;
mod sensor;
mod signal;

pub use {
    binding::{HotkeyBinding, SensorKey},
    sensor::{DEFAULT_POLL_INTERVAL, Edge, EdgeDetector, KeyStateProbe, SensorPoller},
    signal::{HotkeySource, HotkeyTrigger, LatchState, ReleaseSignal, hotkey_signal},
};
