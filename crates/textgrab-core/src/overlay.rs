use textgrab_types::{Point, SelectionRect};
use thiserror::Error;

use crate::capture::Screenshot;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("selection overlay unavailable: {0}")]
pub struct OverlayError(pub String);

/// Where the drag gesture currently is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayState {
    /// Bitmap shown, pointer not pressed yet
    Displaying,
    Dragging { anchor: Point, current: Point },
    Finalized(SelectionRect),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayInput {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Escape,
}

/// Result handed back to the session once the overlay is done
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayOutcome {
    Selected(SelectionRect),
    Cancelled,
}

/// Drag-to-select gesture tracker for one overlay session
#[derive(Debug, Clone)]
pub struct SelectionOverlay {
    state: OverlayState,
}

impl Default for SelectionOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionOverlay {
    pub fn new() -> Self {
        Self {
            state: OverlayState::Displaying,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Rectangle to draw while dragging
    pub fn live_rect(&self) -> Option<SelectionRect> {
        match self.state {
            OverlayState::Dragging { anchor, current } => {
                Some(SelectionRect::from_corners(anchor, current))
            }
            OverlayState::Finalized(rect) => Some(rect),
            OverlayState::Displaying | OverlayState::Cancelled => None,
        }
    }

    /// Feed one input event. Returns the outcome on the transition into a final state.
    pub fn handle(&mut self, input: OverlayInput) -> Option<OverlayOutcome> {
        let next = match (self.state, input) {
            (OverlayState::Displaying, OverlayInput::PointerDown(p)) => OverlayState::Dragging {
                anchor: p,
                current: p,
            },
            (OverlayState::Dragging { anchor, .. }, OverlayInput::PointerMove(p)) => {
                OverlayState::Dragging { anchor, current: p }
            }
            (OverlayState::Dragging { anchor, .. }, OverlayInput::PointerUp(p)) => {
                OverlayState::Finalized(SelectionRect::from_corners(anchor, p))
            }
            (
                OverlayState::Displaying | OverlayState::Dragging { .. },
                OverlayInput::Escape,
            ) => OverlayState::Cancelled,
            _ => return None,
        };

        self.state = next;
        tracing::trace!(state = ?self.state, "overlay transition");

        match next {
            OverlayState::Finalized(rect) => Some(OverlayOutcome::Selected(rect)),
            OverlayState::Cancelled => Some(OverlayOutcome::Cancelled),
            _ => None,
        }
    }
}

/// Full-screen, topmost, input-capturing window showing the capture
pub trait OverlaySurface {
    fn show(&mut self, screenshot: &Screenshot) -> Result<(), OverlayError>;

    /// Tear the surface down and give the cursor back. Must be idempotent.
    fn hide(&mut self);
}

/// Owns the surface and hides it on every exit path, including drop
pub struct OverlayHandle {
    surface: Box<dyn OverlaySurface>,
    visible: bool,
}

impl OverlayHandle {
    pub fn new(surface: Box<dyn OverlaySurface>) -> Self {
        Self {
            surface,
            visible: false,
        }
    }

    pub fn show(&mut self, screenshot: &Screenshot) -> Result<(), OverlayError> {
        let result = self.surface.show(screenshot);
        self.visible = true;
        if result.is_err() {
            self.hide();
        }
        result
    }

    pub fn hide(&mut self) {
        if self.visible {
            self.surface.hide();
            self.visible = false;
        }
    }
}

impl Drop for OverlayHandle {
    fn drop(&mut self) {
        self.hide();
    }
}
