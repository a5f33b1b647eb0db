pub mod capture;
pub mod clipboard;
pub mod dispatch;
pub mod events;
pub mod geometry;
pub mod hotkey;
pub mod notify;
pub mod overlay;
pub mod session;

#[cfg(any(test, feature = "test-util"))]
pub mod fakes;
#[cfg(test)]
mod tests;

pub use capture::{CapturedBitmap, ScreenCapture, Screenshot};
pub use clipboard::ClipboardSink;
pub use dispatch::{
    BackendInit, BackendProvider, BackendRegistry, BackendStatus, DispatchJob, InitCompletion,
    OcrDispatcher, Recognizer,
};
pub use events::AppEvent;
pub use geometry::map_to_source;
pub use hotkey::{HotkeyId, HotkeyManager, HotkeyRegistrar, RegistrarError};
pub use notify::Notifier;
pub use overlay::{
    OverlayError, OverlayHandle, OverlayInput, OverlayOutcome, OverlayState, OverlaySurface,
    SelectionOverlay,
};
pub use session::{CaptureSession, SessionPorts, SessionState, TriggerOutcome};
