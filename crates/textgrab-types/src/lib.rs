pub mod error;
pub mod shortcut;
pub mod types;

pub use error::{
    BackendError, CaptureError, ClipboardError, HotkeyError, OcrError, RecognitionError,
    ShortcutError,
};
pub use shortcut::{KeyCapture, Modifiers, Shortcut};
pub use types::{
    BackendId, DisplayGeometry, Notice, Point, SelectionRect, Severity, SourceRect,
};
