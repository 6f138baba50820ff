//! Media player volume control through AppleScript.

use smart_dictation_core::{CoreResult, DictationError, VolumeControl};

use std::{panic::Location, process::Stdio};

use error_location::ErrorLocation;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Drives a scriptable player (Apple Music by default) with `osascript`.
///
/// Every call spawns one `osascript` process. The child is killed if the
/// caller stops waiting, so a timed-out call does not leak a process.
#[derive(Debug, Clone)]
pub struct AppleScriptVolume {
    target_app: String,
}

impl AppleScriptVolume {
    /// Control the application named `target_app`.
    pub fn new(target_app: &str) -> Self {
        Self {
            target_app: escape(target_app),
        }
    }

    pub(crate) fn running_script(&self) -> String {
        format!(
            r#"tell application "System Events" to (name of processes) contains "{}""#,
            self.target_app
        )
    }

    pub(crate) fn playing_script(&self) -> String {
        format!(r#"tell application "{}" to player state is playing"#, self.target_app)
    }

    pub(crate) fn get_volume_script(&self) -> String {
        format!(r#"tell application "{}" to get sound volume"#, self.target_app)
    }

    pub(crate) fn set_volume_script(&self, volume: u8) -> String {
        format!(
            r#"tell application "{}" to set sound volume to {}"#,
            self.target_app,
            volume.min(100)
        )
    }

    #[instrument(skip(self))]
    async fn run(&self, script: String) -> CoreResult<String> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DictationError::VolumeControl {
                reason: format!("Failed to run osascript: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(status = ?output.status, stderr = %stderr, "AppleScript command failed");
            return Err(DictationError::VolumeControl {
                reason: format!("osascript exited with {}: {}", output.status, stderr),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let stdout = normalize_output(&String::from_utf8_lossy(&output.stdout));
        debug!(stdout = %stdout, "AppleScript command succeeded");
        Ok(stdout)
    }
}

impl VolumeControl for AppleScriptVolume {
    async fn is_target_running(&self) -> CoreResult<bool> {
        let out = self.run(self.running_script()).await?;
        Ok(parse_flag(&out))
    }

    async fn is_target_playing(&self) -> CoreResult<bool> {
        let out = self.run(self.playing_script()).await?;
        Ok(parse_flag(&out))
    }

    async fn volume(&self) -> CoreResult<u8> {
        let out = self.run(self.get_volume_script()).await?;
        parse_volume(&out).ok_or_else(|| DictationError::VolumeControl {
            reason: format!("Unparseable volume: {:?}", out),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn set_volume(&self, volume: u8) -> CoreResult<()> {
        self.run(self.set_volume_script(volume)).await?;
        Ok(())
    }
}

/// Trimmed, lowercased `osascript` output.
pub(crate) fn normalize_output(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// AppleScript booleans print as `true` / `false`.
pub(crate) fn parse_flag(output: &str) -> bool {
    normalize_output(output) == "true"
}

/// Volume as printed by `get sound volume`, clamped to 0 to 100.
pub(crate) fn parse_volume(output: &str) -> Option<u8> {
    let value: i64 = normalize_output(output).parse().ok()?;
    u8::try_from(value.clamp(0, 100)).ok()
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}
