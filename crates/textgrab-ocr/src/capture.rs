use std::time::Instant;

use anyhow::{Context, Result};
use image::{RgbaImage, imageops};
use textgrab_config::capture::CaptureConfig;
use textgrab_core::{CapturedBitmap, ScreenCapture, Screenshot};
use textgrab_types::{CaptureError, DisplayGeometry};
use xcap::Monitor;

/// One monitor's pixels plus where it sits in the desktop coordinate space
#[derive(Debug, Clone)]
struct MonitorGrab {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    scale_factor: f32,
    is_primary: bool,
    image: RgbaImage,
}

/// Screen capture through `xcap`
pub struct XcapCapture {
    all_monitors: bool,
}

impl XcapCapture {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            all_monitors: config.all_monitors,
        }
    }
}

impl ScreenCapture for XcapCapture {
    fn capture(&self) -> Result<Screenshot, CaptureError> {
        let start = Instant::now();
        let grabs = grab_monitors(self.all_monitors)
            .map_err(|e| CaptureError::Unavailable(format!("{e:#}")))?;
        let screenshot = composite(grabs).map_err(|e| CaptureError::Unavailable(format!("{e:#}")))?;

        tracing::debug!(
            width = screenshot.bitmap.width(),
            height = screenshot.bitmap.height(),
            elapsed = ?start.elapsed(),
            "Captured screen"
        );
        Ok(screenshot)
    }
}

fn grab_monitors(all_monitors: bool) -> Result<Vec<MonitorGrab>> {
    let monitors = Monitor::all().context("Failed to get monitors")?;
    let monitors: Vec<Monitor> = if all_monitors {
        monitors
    } else {
        let primary = monitors.iter().position(|m| m.is_primary()).unwrap_or(0);
        monitors.into_iter().skip(primary).take(1).collect()
    };

    anyhow::ensure!(!monitors.is_empty(), "No monitor found");

    monitors
        .iter()
        .map(|monitor| {
            let image = monitor
                .capture_image()
                .with_context(|| format!("Failed to capture monitor {}", monitor.name()))?;
            Ok(MonitorGrab {
                x: monitor.x(),
                y: monitor.y(),
                width: monitor.width(),
                height: monitor.height(),
                scale_factor: monitor.scale_factor(),
                is_primary: monitor.is_primary(),
                image,
            })
        })
        .collect()
}

/// Stitch monitor grabs into one virtual-screen bitmap.
///
/// The primary monitor sets the pixel density of the result. Its scale factor
/// converts desktop coordinates to the logical units the overlay window uses.
fn composite(grabs: Vec<MonitorGrab>) -> Result<Screenshot> {
    let reference = grabs
        .iter()
        .find(|g| g.is_primary)
        .or(grabs.first())
        .context("No monitor found")?;
    anyhow::ensure!(
        reference.width > 0 && reference.height > 0,
        "Monitor reports an empty size"
    );

    let pixels_per_unit = reference.image.width() as f64 / reference.width as f64;
    let scale = if reference.scale_factor > 0.0 {
        reference.scale_factor as f64
    } else {
        1.0
    };
    let logical_per_unit = pixels_per_unit / scale;

    let min_x = grabs.iter().map(|g| g.x).min().unwrap_or(0);
    let min_y = grabs.iter().map(|g| g.y).min().unwrap_or(0);
    let max_x = grabs.iter().map(|g| g.x + g.width as i32).max().unwrap_or(0);
    let max_y = grabs.iter().map(|g| g.y + g.height as i32).max().unwrap_or(0);
    let span_x = (max_x - min_x) as f64;
    let span_y = (max_y - min_y) as f64;

    let image = if let [single] = grabs.as_slice() {
        single.image.clone()
    } else {
        let mut canvas = RgbaImage::new(
            (span_x * pixels_per_unit).round().max(1.0) as u32,
            (span_y * pixels_per_unit).round().max(1.0) as u32,
        );
        for grab in &grabs {
            let width = (grab.width as f64 * pixels_per_unit).round().max(1.0) as u32;
            let height = (grab.height as f64 * pixels_per_unit).round().max(1.0) as u32;
            let left = ((grab.x - min_x) as f64 * pixels_per_unit).round() as i64;
            let top = ((grab.y - min_y) as f64 * pixels_per_unit).round() as i64;

            if grab.image.dimensions() == (width, height) {
                imageops::replace(&mut canvas, &grab.image, left, top);
            } else {
                let resized =
                    imageops::resize(&grab.image, width, height, imageops::FilterType::Triangle);
                imageops::replace(&mut canvas, &resized, left, top);
            }
        }
        canvas
    };

    let geometry = DisplayGeometry {
        x: (min_x as f64 * logical_per_unit).round() as i32,
        y: (min_y as f64 * logical_per_unit).round() as i32,
        width: (span_x * logical_per_unit).round() as u32,
        height: (span_y * logical_per_unit).round() as u32,
    };

    Ok(Screenshot {
        bitmap: CapturedBitmap::new(image)?,
        geometry,
    })
}
