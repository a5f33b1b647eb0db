use thiserror::Error;

use crate::shortcut::Shortcut;
use crate::types::BackendId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortcutError {
    #[error("shortcut is empty")]
    Empty,

    #[error("shortcut has no key besides modifiers")]
    MissingKey,

    #[error("shortcut has more than one key: {0} and {1}")]
    MultipleKeys(String, String),

    #[error("escape cannot be used as a shortcut")]
    Escape,

    #[error("invalid key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("a shortcut change is already in progress")]
    Busy,

    #[error("{shortcut} is already in use by another application")]
    Unavailable { shortcut: Shortcut, restored: bool },

    #[error("failed to register {shortcut}: {reason}")]
    RegistrationFailed {
        shortcut: Shortcut,
        reason: String,
        restored: bool,
    },
}

impl HotkeyError {
    /// Whether the previously working shortcut is registered again.
    ///
    /// `Busy` never touches the registration, so it counts as restored.
    pub fn restored(&self) -> bool {
        match self {
            HotkeyError::Busy => true,
            HotkeyError::Unavailable { restored, .. }
            | HotkeyError::RegistrationFailed { restored, .. } => *restored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("screen capture unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    #[error("no OCR backend is initialized")]
    BackendNotInitialized,

    #[error("OCR backend failed: {0}")]
    BackendFailure(String),

    #[error("no text recognized")]
    EmptyResult,
}

/// Error raised by a recognition engine itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Engine(String),
}

impl From<RecognitionError> for OcrError {
    fn from(value: RecognitionError) -> Self {
        OcrError::BackendFailure(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("unknown OCR backend: {0}")]
    UnknownBackend(BackendId),

    #[error("failed to initialize {backend}: {reason}")]
    InitFailed { backend: BackendId, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("clipboard error: {0}")]
pub struct ClipboardError(pub String);
