use std::{convert::Infallible, fmt, str::FromStr};

/// Dedicated keys detected by sampling hardware state instead of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKey {
    /// The `fn` / globe key on Apple keyboards.
    Fn,
}

/// Identity of one logical key gesture.
///
/// Parsed from the configured hotkey strings. `fn` and `<fn>` select the
/// sensor key; anything else is a key combination. Angle-bracket spellings
/// such as `<ctrl>+<alt>+h` are normalized to `ctrl+alt+h`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HotkeyBinding {
    /// A combination of keys delivered by a global key hook.
    Combo {
        /// Normalized accelerator, e.g. `ctrl+shift+Space`.
        accelerator: String,
    },
    /// A single key sampled by a polling thread.
    Sensor(SensorKey),
}

impl HotkeyBinding {
    /// Accelerator string for combo bindings.
    pub fn accelerator(&self) -> Option<&str> {
        match self {
            HotkeyBinding::Combo { accelerator } => Some(accelerator),
            HotkeyBinding::Sensor(_) => None,
        }
    }
}

impl FromStr for HotkeyBinding {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.eq_ignore_ascii_case("fn") || trimmed.eq_ignore_ascii_case("<fn>") {
            return Ok(HotkeyBinding::Sensor(SensorKey::Fn));
        }

        let accelerator = trimmed
            .split('+')
            .map(|part| part.trim().trim_start_matches('<').trim_end_matches('>'))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("+");

        Ok(HotkeyBinding::Combo { accelerator })
    }
}

impl fmt::Display for HotkeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotkeyBinding::Combo { accelerator } => write!(f, "{}", accelerator),
            HotkeyBinding::Sensor(SensorKey::Fn) => write!(f, "fn"),
        }
    }
}
