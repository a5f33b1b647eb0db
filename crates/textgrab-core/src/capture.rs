use std::sync::Arc;

use image::RgbaImage;
use textgrab_types::{CaptureError, DisplayGeometry, SourceRect};

/// Immutable screen snapshot, cheap to clone and share with the worker
#[derive(Debug, Clone)]
pub struct CapturedBitmap {
    image: Arc<RgbaImage>,
}

impl CapturedBitmap {
    pub fn new(image: RgbaImage) -> Result<Self, CaptureError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptureError::Unavailable(
                "captured image has no pixels".to_string(),
            ));
        }

        Ok(Self {
            image: Arc::new(image),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Copy out the pixels under `region`
    pub fn crop(&self, region: &SourceRect) -> RgbaImage {
        image::imageops::crop_imm(
            self.image.as_ref(),
            region.x,
            region.y,
            region.width,
            region.height,
        )
        .to_image()
    }
}

/// A capture plus the logical geometry the overlay should cover
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub bitmap: CapturedBitmap,
    pub geometry: DisplayGeometry,
}

pub trait ScreenCapture {
    /// Grab the whole screen area as it is right now
    fn capture(&self) -> Result<Screenshot, CaptureError>;
}
