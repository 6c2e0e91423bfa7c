//! Deterministic offline vision model.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::schema::parse_analysis;
use super::{Confidence, ImageInput, SpeciesAnalysis, VisionError, VisionModel};

#[derive(Debug)]
enum Behavior {
    Analysis(SpeciesAnalysis),
    Raw(String),
    Fail(String),
}

/// Vision model that answers without network access.
///
/// Counts calls so tests can assert the model was never reached.
#[derive(Debug)]
pub struct FakeVisionModel {
    behavior: Behavior,
    calls: AtomicUsize,
    last_mime_type: Mutex<Option<String>>,
}

impl Default for FakeVisionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVisionModel {
    /// Always identify a dandelion.
    pub fn new() -> Self {
        Self::with_analysis(Self::default_analysis())
    }

    /// Always return the given analysis.
    pub fn with_analysis(analysis: SpeciesAnalysis) -> Self {
        Self {
            behavior: Behavior::Analysis(analysis),
            calls: AtomicUsize::new(0),
            last_mime_type: Mutex::new(None),
        }
    }

    /// Feed the given text through the strict parser on every call.
    pub fn with_raw_response(raw: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Raw(raw.into()),
            calls: AtomicUsize::new(0),
            last_mime_type: Mutex::new(None),
        }
    }

    /// Fail every call with a request error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail(message.into()),
            calls: AtomicUsize::new(0),
            last_mime_type: Mutex::new(None),
        }
    }

    /// Number of `analyze` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// MIME type of the most recent image.
    pub fn last_mime_type(&self) -> Option<String> {
        self.last_mime_type
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// Analysis returned by [`FakeVisionModel::new`].
    pub fn default_analysis() -> SpeciesAnalysis {
        SpeciesAnalysis {
            species: "Taraxacum officinale".to_string(),
            common_name: "Common dandelion".to_string(),
            safe_to_eat: true,
            safe_to_touch: true,
            confidence: Confidence::High,
            warnings: "Latex in the stem can irritate sensitive skin.".to_string(),
            description: "Perennial herb with a rosette of toothed leaves and a yellow flower head."
                .to_string(),
        }
    }
}

#[async_trait]
impl VisionModel for FakeVisionModel {
    async fn analyze(&self, image: &ImageInput) -> Result<SpeciesAnalysis, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_mime_type.lock() {
            *last = Some(image.mime_type.clone());
        }
        match &self.behavior {
            Behavior::Analysis(analysis) => Ok(analysis.clone()),
            Behavior::Raw(raw) => parse_analysis(raw),
            Behavior::Fail(message) => Err(VisionError::RequestFailed(message.clone())),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-vision"
    }
}
