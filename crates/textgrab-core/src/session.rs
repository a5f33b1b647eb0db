use std::rc::Rc;

use textgrab_types::OcrError;

use crate::capture::{ScreenCapture, Screenshot};
use crate::clipboard::ClipboardSink;
use crate::dispatch::{DispatchJob, OcrDispatcher};
use crate::geometry::map_to_source;
use crate::notify::{self, Notifier};
use crate::overlay::{OverlayHandle, OverlayOutcome, OverlaySurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Triggered,
    Captured,
    Selecting,
    Dispatching,
    Done,
    Aborted,
}

/// What a trigger led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A session was already running
    Ignored,
    Aborted,
    /// Overlay is up, waiting for the selection
    Selecting,
}

/// OS-facing collaborators a session drives
pub struct SessionPorts {
    pub capture: Box<dyn ScreenCapture>,
    pub overlay: Box<dyn OverlaySurface>,
    pub clipboard: Box<dyn ClipboardSink>,
    pub notifier: Rc<dyn Notifier>,
}

/// One capture-select-recognize-copy run per trigger, at most one at a time.
///
/// Driven from the UI thread: [`CaptureSession::trigger`] shows the overlay,
/// [`CaptureSession::selection_finished`] hands back the recognition job for the
/// worker and [`CaptureSession::recognition_finished`] publishes the result.
pub struct CaptureSession {
    capture: Box<dyn ScreenCapture>,
    overlay: OverlayHandle,
    clipboard: Box<dyn ClipboardSink>,
    notifier: Rc<dyn Notifier>,
    state: SessionState,
    screenshot: Option<Screenshot>,
    transitions: Vec<SessionState>,
    last_run: Vec<SessionState>,
}

impl CaptureSession {
    pub fn new(ports: SessionPorts) -> Self {
        Self {
            capture: ports.capture,
            overlay: OverlayHandle::new(ports.overlay),
            clipboard: ports.clipboard,
            notifier: ports.notifier,
            state: SessionState::Idle,
            screenshot: None,
            transitions: Vec::new(),
            last_run: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// States visited by the last finished run, from `Idle` back to `Idle`
    pub fn last_run(&self) -> &[SessionState] {
        &self.last_run
    }

    pub fn trigger(&mut self, dispatcher: &OcrDispatcher) -> TriggerOutcome {
        if !self.is_idle() {
            tracing::debug!(state = ?self.state, "Capture already in progress, ignoring trigger");
            return TriggerOutcome::Ignored;
        }

        self.transitions = vec![SessionState::Idle];

        if !dispatcher.is_ready() {
            tracing::warn!("Hotkey pressed but no OCR backend is ready");
            self.notifier.notify(notify::no_backend());
            self.finish(SessionState::Aborted);
            return TriggerOutcome::Aborted;
        }

        self.enter(SessionState::Triggered);

        let screenshot = match self.capture.capture() {
            Ok(screenshot) => screenshot,
            Err(err) => {
                tracing::error!("Screen capture failed: {err}");
                self.notifier.notify(notify::capture_failed(&err));
                self.finish(SessionState::Aborted);
                return TriggerOutcome::Aborted;
            }
        };

        tracing::debug!(
            bitmap_width = screenshot.bitmap.width(),
            bitmap_height = screenshot.bitmap.height(),
            display_width = screenshot.geometry.width,
            display_height = screenshot.geometry.height,
            "Screen captured"
        );
        self.enter(SessionState::Captured);

        if let Err(err) = self.overlay.show(&screenshot) {
            tracing::error!("Failed to show selection overlay: {err}");
            self.notifier.notify(notify::overlay_failed(&err));
            self.finish(SessionState::Aborted);
            return TriggerOutcome::Aborted;
        }

        self.screenshot = Some(screenshot);
        self.enter(SessionState::Selecting);
        TriggerOutcome::Selecting
    }

    /// Close the overlay and turn the selection into a recognition job.
    ///
    /// Returns `None` when nothing is left to recognize; the session is then idle again.
    pub fn selection_finished(
        &mut self,
        outcome: OverlayOutcome,
        dispatcher: &OcrDispatcher,
    ) -> Option<DispatchJob> {
        if self.state != SessionState::Selecting {
            tracing::debug!(state = ?self.state, "Selection outside of a capture, ignoring");
            return None;
        }

        self.overlay.hide();
        let Some(screenshot) = self.screenshot.take() else {
            self.finish(SessionState::Aborted);
            return None;
        };

        let selection = match outcome {
            OverlayOutcome::Selected(selection) => selection,
            OverlayOutcome::Cancelled => {
                tracing::debug!("Selection cancelled");
                self.finish(SessionState::Aborted);
                return None;
            }
        };

        let Some(region) = map_to_source(
            &selection,
            &screenshot.geometry,
            screenshot.bitmap.width(),
            screenshot.bitmap.height(),
        ) else {
            tracing::debug!(?selection, "Empty selection");
            self.finish(SessionState::Aborted);
            return None;
        };

        match dispatcher.job(&screenshot.bitmap, region) {
            Ok(job) => {
                tracing::debug!(?selection, ?region, "Dispatching selection");
                self.enter(SessionState::Dispatching);
                Some(job)
            }
            Err(err) => {
                tracing::warn!("Cannot recognize selection: {err}");
                self.notifier.notify(notify::recognition_failed(&err));
                self.finish(SessionState::Aborted);
                None
            }
        }
    }

    pub fn recognition_finished(&mut self, result: Result<String, OcrError>) {
        if self.state != SessionState::Dispatching {
            tracing::debug!(state = ?self.state, "Recognition result without a capture, ignoring");
            return;
        }

        match result {
            Ok(text) => {
                match self.clipboard.publish(&text) {
                    Ok(()) => {
                        tracing::info!(chars = text.chars().count(), "Text copied to clipboard");
                        self.notifier.notify(notify::ocr_complete());
                    }
                    Err(err) => {
                        tracing::warn!("Failed to copy text to clipboard: {err}");
                        self.notifier.notify(notify::clipboard_failed(&err));
                    }
                }
                self.finish(SessionState::Done);
            }
            Err(OcrError::EmptyResult) => {
                tracing::info!("No text recognized in selection");
                self.finish(SessionState::Done);
            }
            Err(err) => {
                tracing::error!("Recognition failed: {err}");
                self.notifier.notify(notify::recognition_failed(&err));
                self.finish(SessionState::Aborted);
            }
        }
    }

    fn enter(&mut self, state: SessionState) {
        tracing::trace!(from = ?self.state, to = ?state, "session transition");
        self.state = state;
        self.transitions.push(state);
    }

    fn finish(&mut self, terminal: SessionState) {
        self.overlay.hide();
        self.screenshot = None;
        self.enter(terminal);
        self.enter(SessionState::Idle);
        self.last_run = std::mem::take(&mut self.transitions);
    }
}
