//! State probe for the `fn` / globe key.
//!
//! The key produces no usable events through the global hotkey hook, so it
//! is sampled by a [`SensorPoller`](smart_dictation_core::SensorPoller).

use smart_dictation_core::KeyStateProbe;

#[cfg(not(target_os = "macos"))]
use tracing::warn;

/// Reads the hardware state of the `fn` key.
#[derive(Debug, Default)]
pub struct FnKeyProbe {
    #[cfg(not(target_os = "macos"))]
    warned: std::sync::atomic::AtomicBool,
}

impl FnKeyProbe {
    /// Create a probe for the current platform.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(target_os = "macos")]
mod ffi {
    /// `kCGEventSourceStateHIDSystemState`
    pub(super) const HID_SYSTEM_STATE: i32 = 1;

    /// Virtual key code of the `fn` key.
    pub(super) const FN_KEY_CODE: u16 = 63;

    #[link(name = "ApplicationServices", kind = "framework")]
    unsafe extern "C" {
        pub(super) fn CGEventSourceKeyState(state_id: i32, key: u16) -> bool;
    }
}

#[cfg(target_os = "macos")]
impl KeyStateProbe for FnKeyProbe {
    fn is_pressed(&self) -> bool {
        // SAFETY: pure query of the HID key state table; no pointers involved.
        unsafe { ffi::CGEventSourceKeyState(ffi::HID_SYSTEM_STATE, ffi::FN_KEY_CODE) }
    }
}

#[cfg(not(target_os = "macos"))]
impl KeyStateProbe for FnKeyProbe {
    fn is_pressed(&self) -> bool {
        use std::sync::atomic::Ordering;

        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!("fn key detection is only available on macOS; binding will never fire");
        }
        false
    }
}
