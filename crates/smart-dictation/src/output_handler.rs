//! Clipboard delivery with optional auto-paste.

use crate::{AppError, AppResult, PasteModifierGuard};

use smart_dictation_core::{CoreResult, DictationError, OutputSink};

use std::{panic::Location, time::Duration};

use arboard::Clipboard;
use error_location::ErrorLocation;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Gives the clipboard manager time to take the write before pasting.
const CLIPBOARD_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Gap between synthetic key events; some input methods drop events
/// that arrive back to back.
const KEY_EVENT_DELAY: Duration = Duration::from_millis(10);

/// Clipboard writer and paste simulator.
pub struct OutputHandler {
    pub(crate) clipboard: Clipboard,
}

impl OutputHandler {
    /// Create a new output handler.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let clipboard = Clipboard::new().map_err(|e| AppError::ClipboardError {
            reason: format!("Failed to initialize clipboard: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!("OutputHandler initialized");

        Ok(Self { clipboard })
    }

    /// Copy `text` to the clipboard and paste it if `auto_paste` is set.
    ///
    /// The clipboard write always happens first, so a failed paste still
    /// leaves the text available.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn output_text(&mut self, text: &str, auto_paste: bool) -> AppResult<()> {
        self.clipboard
            .set_text(text)
            .map_err(|e| AppError::ClipboardError {
                reason: format!("Failed to set clipboard: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!("Text copied to clipboard");

        if auto_paste {
            tokio::time::sleep(CLIPBOARD_SETTLE_DELAY).await;

            if let Err(e) = paste().await {
                warn!(error = ?e, "Auto-paste failed, but text is in clipboard");
                return Err(e);
            }
        }

        info!(auto_pasted = auto_paste, "Text output complete");

        Ok(())
    }
}

#[instrument]
async fn paste() -> AppResult<()> {
    // Enigo is not Send, so it is created on the blocking thread.
    tokio::task::spawn_blocking(|| {
        let mut guard = PasteModifierGuard::press()?;
        std::thread::sleep(KEY_EVENT_DELAY);
        guard.click('v')?;
        std::thread::sleep(KEY_EVENT_DELAY);
        Ok::<(), AppError>(())
    })
    .await
    .map_err(|e| AppError::AutoPasteFailed {
        reason: format!("Paste task panicked: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })??;

    debug!("Auto-paste simulated");

    Ok(())
}

/// [`OutputSink`] that delivers transcripts through an [`OutputHandler`].
pub struct ClipboardSink {
    handler: Mutex<OutputHandler>,
    auto_paste: bool,
}

impl ClipboardSink {
    /// Wrap `handler`, pasting after each copy when `auto_paste` is set.
    pub fn new(handler: OutputHandler, auto_paste: bool) -> Self {
        Self {
            handler: Mutex::new(handler),
            auto_paste,
        }
    }
}

impl OutputSink for ClipboardSink {
    async fn deliver(&self, text: &str) -> CoreResult<()> {
        let mut handler = self.handler.lock().await;
        handler
            .output_text(text, self.auto_paste)
            .await
            .map_err(|e| DictationError::DeliveryFailed {
                source: Box::new(e),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
