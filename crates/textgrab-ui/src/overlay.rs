use std::cell::RefCell;
use std::rc::Rc;

use kanal::AsyncSender;
use slint::{
    CloseRequestResponse, ComponentHandle, Image, LogicalPosition, LogicalSize, Rgba8Pixel,
    SharedPixelBuffer,
};
use textgrab_core::{
    AppEvent, OverlayError, OverlayInput, OverlaySurface, Screenshot, SelectionOverlay,
};
use textgrab_types::Point;

use crate::SelectionWindow;

/// [`OverlaySurface`] drawn with Slint. Finished gestures are posted as
/// [`AppEvent::SelectionFinished`].
pub struct SlintOverlay {
    window: SelectionWindow,
    gesture: Rc<RefCell<SelectionOverlay>>,
}

impl SlintOverlay {
    pub fn new(events: AsyncSender<AppEvent>) -> anyhow::Result<Self> {
        let window = SelectionWindow::new()?;
        let gesture = Rc::new(RefCell::new(SelectionOverlay::new()));

        let feed = {
            let gesture = gesture.clone();
            let window_weak = window.as_weak();
            Rc::new(move |input: OverlayInput| {
                let outcome = gesture.borrow_mut().handle(input);
                if let Some(window) = window_weak.upgrade() {
                    draw_selection(&window, &gesture.borrow());
                }

                if let Some(outcome) = outcome {
                    tracing::debug!(?outcome, "Selection finished");
                    match events.try_send(AppEvent::SelectionFinished(outcome)) {
                        Ok(true) => {}
                        Ok(false) => tracing::warn!("Event queue full, selection dropped"),
                        Err(e) => tracing::error!("Failed to send selection: {e}"),
                    }
                }
            })
        };

        window.on_pointer_down({
            let feed = feed.clone();
            move |x, y| feed(OverlayInput::PointerDown(point(x, y)))
        });
        window.on_pointer_move({
            let feed = feed.clone();
            move |x, y| feed(OverlayInput::PointerMove(point(x, y)))
        });
        window.on_pointer_up({
            let feed = feed.clone();
            move |x, y| feed(OverlayInput::PointerUp(point(x, y)))
        });
        window.on_cancel({
            let feed = feed.clone();
            move || feed(OverlayInput::Escape)
        });
        // Closed by the window manager (Alt+F4, logout) counts as a cancel
        window.window().on_close_requested(move || {
            feed(OverlayInput::Escape);
            CloseRequestResponse::HideWindow
        });

        Ok(Self { window, gesture })
    }
}

impl OverlaySurface for SlintOverlay {
    fn show(&mut self, screenshot: &Screenshot) -> Result<(), OverlayError> {
        *self.gesture.borrow_mut() = SelectionOverlay::new();
        self.window.set_dragging(false);

        let image = screenshot.bitmap.image();
        let buffer = SharedPixelBuffer::<Rgba8Pixel>::clone_from_slice(
            image.as_raw(),
            image.width(),
            image.height(),
        );
        self.window.set_screenshot(Image::from_rgba8(buffer));

        let geometry = screenshot.geometry;
        let window = self.window.window();
        window.set_position(LogicalPosition::new(geometry.x as f32, geometry.y as f32));
        window.set_size(LogicalSize::new(
            geometry.width as f32,
            geometry.height as f32,
        ));

        self.window
            .show()
            .map_err(|e| OverlayError(e.to_string()))?;
        tracing::debug!(?geometry, "Selection overlay shown");
        Ok(())
    }

    fn hide(&mut self) {
        if let Err(e) = self.window.hide() {
            tracing::warn!("Failed to hide selection overlay: {e}");
        }
        self.window.set_dragging(false);
        self.window.set_screenshot(Image::default());
    }
}

fn point(x: f32, y: f32) -> Point {
    Point::new(f64::from(x), f64::from(y))
}

fn draw_selection(window: &SelectionWindow, gesture: &SelectionOverlay) {
    match gesture.live_rect() {
        Some(rect) => {
            window.set_sel_x(rect.x as f32);
            window.set_sel_y(rect.y as f32);
            window.set_sel_width(rect.width as f32);
            window.set_sel_height(rect.height as f32);
            window.set_dragging(true);
        }
        None => window.set_dragging(false),
    }
}
