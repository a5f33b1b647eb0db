use textgrab_types::{
    BackendError, CaptureError, ClipboardError, HotkeyError, Notice, OcrError, Severity,
};

use crate::overlay::OverlayError;

/// Presentation layer for user-facing notices
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

pub fn no_backend() -> Notice {
    Notice::warning(
        "No OCR Backend",
        "Select and initialize an OCR backend in the settings first.",
    )
}

pub fn capture_failed(err: &CaptureError) -> Notice {
    Notice::error("Capture Error", err.to_string())
}

pub fn overlay_failed(err: &OverlayError) -> Notice {
    Notice::error("Capture Error", err.to_string())
}

pub fn recognition_failed(err: &OcrError) -> Notice {
    match err {
        OcrError::BackendNotInitialized => no_backend(),
        other => Notice::error("OCR Error", format!("Error processing image: {other}")),
    }
}

pub fn clipboard_failed(err: &ClipboardError) -> Notice {
    Notice::warning("Clipboard Error", err.to_string())
}

pub fn ocr_complete() -> Notice {
    Notice::info("OCR Complete", "Text has been copied to clipboard")
}

/// A rebind that also lost the previous shortcut leaves the app without a trigger,
/// so it stays on screen.
pub fn hotkey_failed(err: &HotkeyError) -> Notice {
    if err.restored() {
        Notice::warning(
            "Hotkey Error",
            format!("{err}. The previous shortcut is still active."),
        )
    } else {
        Notice::new(
            "Hotkey Error",
            format!("{err}. No shortcut is active; choose a different one in the settings."),
            Severity::Persistent,
        )
    }
}

pub fn backend_ready(name: &str) -> Notice {
    Notice::info("OCR Ready", format!("{name} is initialized"))
}

pub fn backend_failed(err: &BackendError) -> Notice {
    Notice::error("Backend Not Available", err.to_string())
}
