use anyhow::Context;
use arboard::Clipboard;
use textgrab_core::ClipboardSink;
use textgrab_types::ClipboardError;

/// System clipboard through `arboard`.
///
/// The handle lives as long as the app: on X11 and Wayland the copied text is
/// only served while its owner is alive.
pub struct SystemClipboard {
    clipboard: Clipboard,
}

impl SystemClipboard {
    pub fn new() -> anyhow::Result<Self> {
        let clipboard = Clipboard::new().context("Failed to open clipboard")?;
        Ok(Self { clipboard })
    }
}

impl ClipboardSink for SystemClipboard {
    fn publish(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard
            .set_text(text)
            .map_err(|e| ClipboardError(e.to_string()))?;
        tracing::debug!(chars = text.chars().count(), "Clipboard updated");
        Ok(())
    }
}
