//! Fake ports for driving the pipeline without an OS

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::RgbaImage;
use textgrab_types::{
    BackendId, CaptureError, ClipboardError, DisplayGeometry, Notice, RecognitionError, Shortcut,
};

use crate::capture::{CapturedBitmap, ScreenCapture, Screenshot};
use crate::clipboard::ClipboardSink;
use crate::dispatch::{BackendProvider, BackendRegistry, OcrDispatcher, Recognizer};
use crate::hotkey::{HotkeyId, HotkeyRegistrar, RegistrarError};
use crate::notify::Notifier;
use crate::overlay::{OverlayError, OverlaySurface};
use crate::session::{CaptureSession, SessionPorts};

#[derive(Clone)]
pub struct FixedRecognizer {
    result: Result<String, RecognitionError>,
    seen: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl FixedRecognizer {
    pub fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            seen: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(RecognitionError::Engine(message.to_string())),
            seen: Arc::default(),
        }
    }

    /// Sizes of every image handed to `recognize`
    pub fn seen_sizes(&self) -> Vec<(u32, u32)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for FixedRecognizer {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError> {
        self.seen.lock().unwrap().push(image.dimensions());
        self.result.clone()
    }
}

pub struct FixedProvider {
    result: Result<FixedRecognizer, RecognitionError>,
}

impl FixedProvider {
    pub fn ready(recognizer: FixedRecognizer) -> Self {
        Self {
            result: Ok(recognizer),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(RecognitionError::Unavailable(message.to_string())),
        }
    }
}

#[async_trait]
impl BackendProvider for FixedProvider {
    async fn initialize(&self) -> Result<Arc<dyn Recognizer>, RecognitionError> {
        match &self.result {
            Ok(recognizer) => Ok(Arc::new(recognizer.clone())),
            Err(err) => Err(err.clone()),
        }
    }
}

/// Dispatcher with `recognizer` selected and initialized
pub async fn ready_dispatcher(recognizer: FixedRecognizer) -> OcrDispatcher {
    let mut registry = BackendRegistry::new();
    registry.register(
        BackendId::new("fake"),
        Arc::new(FixedProvider::ready(recognizer)),
    );

    let mut dispatcher = OcrDispatcher::new(registry);
    let init = dispatcher
        .select(BackendId::new("fake"))
        .unwrap()
        .expect("fresh selection needs initialization");
    dispatcher.complete_init(init.run().await).unwrap();
    dispatcher
}

/// Everything the fake ports observed during a test
#[derive(Default)]
pub struct Observed {
    pub captures: usize,
    pub shows: usize,
    pub hides: usize,
    pub clipboard: Vec<String>,
    pub notices: Vec<Notice>,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Observed>>);

impl Recorder {
    pub fn with<T>(&self, f: impl FnOnce(&Observed) -> T) -> T {
        f(&self.0.lock().unwrap())
    }

    pub fn captures(&self) -> usize {
        self.with(|o| o.captures)
    }

    pub fn clipboard(&self) -> Vec<String> {
        self.with(|o| o.clipboard.clone())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.with(|o| o.notices.clone())
    }

    fn update(&self, f: impl FnOnce(&mut Observed)) {
        f(&mut self.0.lock().unwrap())
    }
}

struct FakeCapture {
    recorder: Recorder,
    bitmap: (u32, u32),
    geometry: DisplayGeometry,
    fail: bool,
}

impl ScreenCapture for FakeCapture {
    fn capture(&self) -> Result<Screenshot, CaptureError> {
        self.recorder.update(|o| o.captures += 1);
        if self.fail {
            return Err(CaptureError::Unavailable("no monitors found".to_string()));
        }

        let (width, height) = self.bitmap;
        Ok(Screenshot {
            bitmap: CapturedBitmap::new(RgbaImage::new(width, height))?,
            geometry: self.geometry,
        })
    }
}

struct FakeOverlay {
    recorder: Recorder,
    fail: bool,
}

impl OverlaySurface for FakeOverlay {
    fn show(&mut self, _screenshot: &Screenshot) -> Result<(), OverlayError> {
        self.recorder.update(|o| o.shows += 1);
        if self.fail {
            return Err(OverlayError("window creation failed".to_string()));
        }
        Ok(())
    }

    fn hide(&mut self) {
        self.recorder.update(|o| o.hides += 1);
    }
}

struct FakeClipboard {
    recorder: Recorder,
    fail: bool,
}

impl ClipboardSink for FakeClipboard {
    fn publish(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError("clipboard is locked".to_string()));
        }
        self.recorder.update(|o| o.clipboard.push(text.to_string()));
        Ok(())
    }
}

struct FakeNotifier {
    recorder: Recorder,
}

impl Notifier for FakeNotifier {
    fn notify(&self, notice: Notice) {
        self.recorder.update(|o| o.notices.push(notice));
    }
}

/// Builds a [`CaptureSession`] over fake ports
pub struct Harness {
    pub recorder: Recorder,
    bitmap: (u32, u32),
    geometry: DisplayGeometry,
    capture_fails: bool,
    overlay_fails: bool,
    clipboard_fails: bool,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            recorder: Recorder::default(),
            bitmap: (3840, 2160),
            geometry: DisplayGeometry::new(1920, 1080),
            capture_fails: false,
            overlay_fails: false,
            clipboard_fails: false,
        }
    }
}

impl Harness {
    pub fn capture_fails(mut self) -> Self {
        self.capture_fails = true;
        self
    }

    pub fn overlay_fails(mut self) -> Self {
        self.overlay_fails = true;
        self
    }

    pub fn clipboard_fails(mut self) -> Self {
        self.clipboard_fails = true;
        self
    }

    /// Notifier that records into this harness's recorder
    pub fn notifier(&self) -> Rc<dyn Notifier> {
        Rc::new(FakeNotifier {
            recorder: self.recorder.clone(),
        })
    }

    pub fn session(&self) -> CaptureSession {
        CaptureSession::new(SessionPorts {
            capture: Box::new(FakeCapture {
                recorder: self.recorder.clone(),
                bitmap: self.bitmap,
                geometry: self.geometry,
                fail: self.capture_fails,
            }),
            overlay: Box::new(FakeOverlay {
                recorder: self.recorder.clone(),
                fail: self.overlay_fails,
            }),
            clipboard: Box::new(FakeClipboard {
                recorder: self.recorder.clone(),
                fail: self.clipboard_fails,
            }),
            notifier: self.notifier(),
        })
    }
}

#[derive(Default)]
pub struct RegistrarLog {
    next_id: HotkeyId,
    pub live: BTreeMap<HotkeyId, Shortcut>,
    pub registrations: usize,
    refused: Vec<(Shortcut, RegistrarError)>,
}

/// In-memory OS hotkey table. Clones share the same table.
#[derive(Clone, Default)]
pub struct FakeRegistrar {
    log: Arc<Mutex<RegistrarLog>>,
    gate: Option<(kanal::Sender<()>, kanal::Receiver<()>)>,
}

impl FakeRegistrar {
    /// Make the OS refuse `shortcut` with `err` from now on
    pub fn refuse(&self, shortcut: &str, err: RegistrarError) {
        let shortcut = shortcut.parse().unwrap();
        self.log.lock().unwrap().refused.push((shortcut, err));
    }

    /// Block every `register` call: it signals on `entered`, then waits on `release`
    pub fn gated(&self, entered: kanal::Sender<()>, release: kanal::Receiver<()>) -> Self {
        Self {
            log: self.log.clone(),
            gate: Some((entered, release)),
        }
    }

    pub fn live(&self) -> Vec<Shortcut> {
        self.log.lock().unwrap().live.values().cloned().collect()
    }

    pub fn registrations(&self) -> usize {
        self.log.lock().unwrap().registrations
    }
}

impl HotkeyRegistrar for FakeRegistrar {
    fn register(&mut self, shortcut: &Shortcut) -> Result<HotkeyId, RegistrarError> {
        if let Some((entered, release)) = &self.gate {
            entered.send(()).unwrap();
            release.recv().unwrap();
        }

        let mut log = self.log.lock().unwrap();
        if let Some((_, err)) = log.refused.iter().find(|(s, _)| s == shortcut) {
            return Err(err.clone());
        }
        if log.live.values().any(|s| s == shortcut) {
            return Err(RegistrarError::Unavailable);
        }

        log.next_id += 1;
        let id = log.next_id;
        log.live.insert(id, shortcut.clone());
        log.registrations += 1;
        Ok(id)
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<(), RegistrarError> {
        let mut log = self.log.lock().unwrap();
        log.live
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RegistrarError::Os(format!("hotkey {id} is not registered")))
    }
}
