use std::sync::Arc;

use anyhow::{Context, Result};
use image::{ExtendedColorType, ImageEncoder, RgbaImage, codecs::png::PngEncoder};
use textgrab_config::{BackendConfig, ocr::OcrConfig};
use textgrab_core::BackendRegistry;

mod command;
#[cfg(windows)]
mod windows_ocr;

use command::CommandProvider;
#[cfg(windows)]
use windows_ocr::WindowsOcrProvider;

/// Build the backend table from the configured entries.
///
/// Entries the current platform cannot run are skipped with a warning, so selecting
/// them later reports `UnknownBackend`.
pub fn build_registry(config: &OcrConfig) -> BackendRegistry {
    let mut registry = BackendRegistry::new();

    for (id, backend) in &config.backends {
        match backend {
            BackendConfig::Command { .. } => {
                if let Some(provider) = CommandProvider::from_config(backend) {
                    registry.register(id.clone(), Arc::new(provider));
                }
            }
            #[cfg(windows)]
            BackendConfig::WindowsOcr { language } => {
                registry.register(id.clone(), Arc::new(WindowsOcrProvider::new(language)));
            }
            #[cfg(not(windows))]
            BackendConfig::WindowsOcr { .. } => {
                tracing::debug!(backend = %id, "Windows OCR is not available on this platform");
            }
        }
    }

    tracing::debug!(
        backends = ?registry.ids().map(|id| id.as_str()).collect::<Vec<_>>(),
        "OCR backends registered"
    );
    registry
}

pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use textgrab_types::BackendId;

    use super::*;

    #[test]
    fn test_default_config_registers_command_backends() {
        let registry = build_registry(&OcrConfig::default());
        assert!(registry.get(&BackendId::new("tesseract")).is_some());
        assert!(registry.get(&BackendId::new("tesseract-jpn")).is_some());
        assert_eq!(
            registry.get(&BackendId::new("windows-ocr")).is_some(),
            cfg!(windows)
        );
    }

    #[test]
    fn test_png_signature() {
        let png = encode_png(&RgbaImage::new(3, 2)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
