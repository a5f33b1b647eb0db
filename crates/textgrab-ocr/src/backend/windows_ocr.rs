use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbaImage;
use textgrab_core::{BackendProvider, Recognizer};
use textgrab_types::RecognitionError;
use windows::{
    Globalization::Language,
    Graphics::Imaging::BitmapDecoder,
    Media::Ocr::OcrEngine,
    Storage::Streams::{DataWriter, InMemoryRandomAccessStream},
    Win32::Foundation::RPC_E_CHANGED_MODE,
    Win32::System::Com::{COINIT_MULTITHREADED, CoInitializeEx, CoUninitialize},
    core::HSTRING,
};

use super::encode_png;

/// `Windows.Media.Ocr` for one recognizer language, e.g. "ja" or "en"
pub struct WindowsOcrProvider {
    language: String,
}

impl WindowsOcrProvider {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl BackendProvider for WindowsOcrProvider {
    async fn initialize(&self) -> Result<Arc<dyn Recognizer>, RecognitionError> {
        let language = self.language.clone();
        let engine = in_apartment(move || WindowsOcr::new(&language))
            .await
            .map_err(|e| RecognitionError::Unavailable(format!("{e:#}")))?;

        tracing::info!(language = %engine.language, "Windows OCR engine created");
        Ok(Arc::new(engine))
    }
}

struct WindowsOcr {
    engine: OcrEngine,
    language: String,
    name: String,
}

impl WindowsOcr {
    fn new(language_code: &str) -> Result<Self> {
        let language = Language::CreateLanguage(&HSTRING::from(language_code))
            .context("Failed to create language")?;

        let engine = OcrEngine::TryCreateFromLanguage(&language)
            .with_context(|| format!("No OCR language pack installed for {language_code}"))?;

        let tag = engine
            .RecognizerLanguage()
            .and_then(|l| l.LanguageTag())
            .map(|tag| tag.to_string())
            .unwrap_or_else(|_| language_code.to_string());

        Ok(Self {
            engine,
            name: format!("Windows OCR ({tag})"),
            language: tag,
        })
    }
}

/// Blocking; needs COM initialized on the calling thread
fn recognize_png(engine: &OcrEngine, png: &[u8]) -> Result<String> {
    let stream = InMemoryRandomAccessStream::new().context("Failed to create stream")?;
    let writer = DataWriter::CreateDataWriter(&stream).context("Failed to create writer")?;

    writer
        .WriteBytes(png)
        .context("Failed to write image bytes")?;
    writer
        .StoreAsync()
        .context("Failed to store async")?
        .get()
        .context("Failed to store data")?;
    writer.FlushAsync().context("Failed to flush")?.get()?;

    stream.Seek(0).context("Failed to seek")?;

    let decoder = BitmapDecoder::CreateAsync(&stream)
        .context("Failed to create decoder async")?
        .get()
        .context("Failed to get decoder")?;

    let bitmap = decoder
        .GetSoftwareBitmapAsync()
        .context("Failed to get bitmap async")?
        .get()
        .context("Failed to get software bitmap")?;

    let result = engine
        .RecognizeAsync(&bitmap)
        .context("Failed to recognize async")?
        .get()
        .context("Failed to get OCR result")?;

    // one output line per recognized line
    let lines = result.Lines().context("Failed to get lines")?;
    let mut text = String::new();
    for line in lines {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&line.Text().context("Failed to get line text")?.to_string());
    }
    Ok(text)
}

#[async_trait]
impl Recognizer for WindowsOcr {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError> {
        let png = encode_png(image).map_err(|e| RecognitionError::Engine(format!("{e:#}")))?;
        let engine = self.engine.clone();

        in_apartment(move || recognize_png(&engine, &png))
            .await
            .map_err(|e| RecognitionError::Engine(format!("{e:#}")))
    }
}

/// COM membership of a blocking-pool thread for the duration of one OCR call.
///
/// Pool threads are reused, so a thread may already sit in a single-threaded
/// apartment set up by other code. WinRT OCR works there too; the apartment is
/// then borrowed and left alone on drop.
struct Apartment {
    owned: bool,
}

impl Apartment {
    fn enter() -> Result<Self> {
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            tracing::debug!("Reusing the thread's single-threaded COM apartment");
            return Ok(Self { owned: false });
        }
        hr.ok().context("Failed to initialize COM")?;
        Ok(Self { owned: true })
    }
}

impl Drop for Apartment {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}

/// Run blocking WinRT work on the tokio blocking pool inside a COM apartment
async fn in_apartment<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let _apartment = Apartment::enter()?;
        work()
    })
    .await
    .context("OCR worker thread panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::System::Com::COINIT_APARTMENTTHREADED;

    #[test]
    fn test_apartment_nests_on_same_thread() {
        let outer = Apartment::enter().unwrap();
        let inner = Apartment::enter().unwrap();
        assert!(outer.owned);
        assert!(inner.owned);
    }

    #[test]
    fn test_single_threaded_apartment_is_borrowed() {
        std::thread::spawn(|| {
            unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok().unwrap();
            let apartment = Apartment::enter().unwrap();
            assert!(!apartment.owned);
            drop(apartment);
            unsafe { CoUninitialize() };
        })
        .join()
        .unwrap();
    }

    #[tokio::test]
    async fn test_in_apartment_returns_work_result() {
        let value = in_apartment(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
    }
}
