use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use image::RgbaImage;
use textgrab_types::{BackendError, BackendId, OcrError, RecognitionError, SourceRect};

use crate::capture::CapturedBitmap;

/// A ready-to-use recognition engine
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Engine name for logs and notices
    fn name(&self) -> &str;

    /// Recognize the text in `image`
    async fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError>;
}

/// Builds a recognizer. May be slow (model loading), so it runs on the worker.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn initialize(&self) -> Result<Arc<dyn Recognizer>, RecognitionError>;
}

/// Capability table keyed by backend id
#[derive(Default, Clone)]
pub struct BackendRegistry {
    providers: BTreeMap<BackendId, Arc<dyn BackendProvider>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: BackendId, provider: Arc<dyn BackendProvider>) {
        self.providers.insert(id, provider);
    }

    pub fn get(&self, id: &BackendId) -> Option<Arc<dyn BackendProvider>> {
        self.providers.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BackendId> {
        self.providers.keys()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Uninitialized,
    Initializing(BackendId),
    Ready(BackendId),
    Failed { backend: BackendId, reason: String },
}

/// Pending backend initialization, to be run on the worker
pub struct BackendInit {
    pub backend: BackendId,
    generation: u64,
    provider: Arc<dyn BackendProvider>,
}

impl BackendInit {
    pub async fn run(self) -> InitCompletion {
        tracing::info!(backend = %self.backend, "Initializing OCR backend");
        let result = self.provider.initialize().await;
        InitCompletion {
            backend: self.backend,
            generation: self.generation,
            result,
        }
    }
}

/// Outcome of a [`BackendInit`], sent back to the UI thread
pub struct InitCompletion {
    pub backend: BackendId,
    generation: u64,
    result: Result<Arc<dyn Recognizer>, RecognitionError>,
}

impl fmt::Debug for InitCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitCompletion")
            .field("backend", &self.backend)
            .field("generation", &self.generation)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// One recognition request: bitmap, region and the engine to run
pub struct DispatchJob {
    bitmap: CapturedBitmap,
    region: SourceRect,
    recognizer: Arc<dyn Recognizer>,
}

impl DispatchJob {
    pub fn region(&self) -> SourceRect {
        self.region
    }

    /// Crop and recognize. Consumes the job so the bitmap is released afterwards.
    pub async fn run(self) -> Result<String, OcrError> {
        let cropped = self.bitmap.crop(&self.region);
        drop(self.bitmap);

        tracing::debug!(
            backend = self.recognizer.name(),
            width = cropped.width(),
            height = cropped.height(),
            "Running recognition"
        );

        let text = self.recognizer.recognize(&cropped).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(OcrError::EmptyResult);
        }

        tracing::debug!(chars = text.chars().count(), "Recognition finished");
        Ok(text.to_string())
    }
}

/// Selects exactly one backend at a time and hands out recognition jobs for it
pub struct OcrDispatcher {
    registry: BackendRegistry,
    status: BackendStatus,
    recognizer: Option<Arc<dyn Recognizer>>,
    generation: u64,
}

impl OcrDispatcher {
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            status: BackendStatus::Uninitialized,
            recognizer: None,
            generation: 0,
        }
    }

    pub fn status(&self) -> &BackendStatus {
        &self.status
    }

    pub fn is_ready(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Switch to `backend`. Returns the initialization to run, or `None` when that
    /// backend is already ready or initializing.
    ///
    /// The previous recognizer is dropped right away, so captures in between
    /// report `BackendNotInitialized`.
    pub fn select(&mut self, backend: BackendId) -> Result<Option<BackendInit>, BackendError> {
        let provider = self
            .registry
            .get(&backend)
            .ok_or_else(|| BackendError::UnknownBackend(backend.clone()))?;

        let in_progress = matches!(
            &self.status,
            BackendStatus::Ready(id) | BackendStatus::Initializing(id) if *id == backend
        );
        if in_progress {
            return Ok(None);
        }

        self.generation += 1;
        self.recognizer = None;
        self.status = BackendStatus::Initializing(backend.clone());

        Ok(Some(BackendInit {
            backend,
            generation: self.generation,
            provider,
        }))
    }

    /// Apply a finished initialization. Completions for a superseded selection are dropped.
    pub fn complete_init(&mut self, completion: InitCompletion) -> Result<bool, BackendError> {
        if completion.generation != self.generation {
            tracing::debug!(backend = %completion.backend, "Discarding stale backend initialization");
            return Ok(false);
        }

        match completion.result {
            Ok(recognizer) => {
                tracing::info!(backend = %completion.backend, "OCR backend ready");
                self.recognizer = Some(recognizer);
                self.status = BackendStatus::Ready(completion.backend);
                Ok(true)
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::error!(backend = %completion.backend, "OCR backend failed to initialize: {reason}");
                self.status = BackendStatus::Failed {
                    backend: completion.backend.clone(),
                    reason: reason.clone(),
                };
                Err(BackendError::InitFailed {
                    backend: completion.backend,
                    reason,
                })
            }
        }
    }

    /// Prepare a recognition of `region` with the current backend
    pub fn job(
        &self,
        bitmap: &CapturedBitmap,
        region: SourceRect,
    ) -> Result<DispatchJob, OcrError> {
        let recognizer = self
            .recognizer
            .clone()
            .ok_or(OcrError::BackendNotInitialized)?;

        Ok(DispatchJob {
            bitmap: bitmap.clone(),
            region,
            recognizer,
        })
    }

    /// Crop `bitmap` to `region` and recognize it with the current backend
    pub async fn dispatch(
        &self,
        bitmap: &CapturedBitmap,
        region: SourceRect,
    ) -> Result<String, OcrError> {
        self.job(bitmap, region)?.run().await
    }
}
