use textgrab_types::{BackendId, OcrError, Shortcut};

use crate::dispatch::InitCompletion;
use crate::hotkey::HotkeyId;
use crate::overlay::OverlayOutcome;

/// Everything the app loop reacts to. Produced by the worker, the hotkey poller,
/// the settings watcher and the overlay window.
#[derive(Debug)]
pub enum AppEvent {
    /// Raw OS hotkey press, still to be matched against the active binding
    HotkeyPressed(HotkeyId),
    /// The active binding fired
    Trigger,
    SelectionFinished(OverlayOutcome),
    RecognitionFinished(Result<String, OcrError>),
    BackendInitialized(InitCompletion),
    SettingsChanged {
        shortcut: Shortcut,
        backend: BackendId,
    },
    Shutdown,
}
