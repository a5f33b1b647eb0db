use textgrab_types::ClipboardError;

/// Destination for recognized text
pub trait ClipboardSink {
    /// Replace the clipboard contents with `text`. Never called with empty text.
    fn publish(&mut self, text: &str) -> Result<(), ClipboardError>;
}
