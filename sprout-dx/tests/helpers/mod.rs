//! Test Helper Utilities
//!
//! Scripted backends and generators plus app construction for sprout-dx
//! integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sprout_dx::backends::ClassifierRegistry;
use sprout_dx::config::DxConfig;
use sprout_dx::generators::{StagedGrowthPredictor, TemplateCareGuide};
use sprout_dx::pipeline::orchestrator::Generators;
use sprout_dx::pipeline::DiagnosisPipeline;
use sprout_dx::types::{
    BoundingBox, CareGuide, CareGuideGenerator, Classifier, ClassifierError, Detection,
    GeneratorError, TreatmentAdvisor, TreatmentRequest,
};
use sprout_dx::{build_router, AppState};

pub const BOUNDARY: &str = "sprout-test-boundary";

/// Classifier with fixed output, optional delay, and a call counter
pub struct ScriptedClassifier {
    id: String,
    output: Result<Vec<Detection>, ClassifierError>,
    delay: Option<Duration>,
    loaded: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn detecting(id: &str, subject: &str, label: &str, confidence: f64) -> Self {
        Self::with_output(
            id,
            Ok(vec![Detection::new(
                label,
                format!("{} {}", subject, label),
                subject,
                confidence,
                BoundingBox::new(12.0, 34.0, 120.0, 96.0),
            )]),
        )
    }

    pub fn nothing(id: &str) -> Self {
        Self::with_output(id, Ok(Vec::new()))
    }

    pub fn unavailable(id: &str) -> Self {
        Self::with_output(id, Err(ClassifierError::unavailable(id, "connection refused")))
    }

    pub fn broken(id: &str) -> Self {
        Self::with_output(id, Err(ClassifierError::inference(id, "malformed output")))
    }

    fn with_output(id: &str, output: Result<Vec<Detection>, ClassifierError>) -> Self {
        Self {
            id: id.to_string(),
            output,
            delay: None,
            loaded: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Classifier for ScriptedClassifier {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<(), ClassifierError> {
        self.output.as_ref().map_err(|e| e.clone())?;
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn classify(&self, _image: &[u8]) -> Result<Vec<Detection>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.output.clone()
    }
}

/// Treatment advisor that answers or fails, counting calls
pub struct ScriptedAdvisor {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedAdvisor {
    pub fn answering() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TreatmentAdvisor for ScriptedAdvisor {
    fn is_available(&self) -> bool {
        true
    }

    async fn advise(&self, request: &TreatmentRequest) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(reason) => Err(GeneratorError::Failure(reason.clone())),
            None => Ok(format!(
                "Treat {} on {}: remove affected leaves and apply a copper fungicide.",
                request.issue, request.subject
            )),
        }
    }
}

/// Care guide generator that always fails
pub struct BrokenCareGuide;

#[async_trait::async_trait]
impl CareGuideGenerator for BrokenCareGuide {
    async fn care_guide(&self, _plant_name: &str) -> Result<CareGuide, GeneratorError> {
        Err(GeneratorError::Failure("care guide service down".to_string()))
    }
}

/// Template care guide, staged growth, and the given advisor
pub fn generators(advisor: Arc<dyn TreatmentAdvisor>) -> Generators {
    Generators {
        advisor,
        care_guide: Arc::new(TemplateCareGuide),
        growth: Arc::new(StagedGrowthPredictor),
    }
}

/// Default config with short timeouts
pub fn test_config() -> DxConfig {
    let mut config = DxConfig::default();
    config.pool.backend_timeout_ms = 2_000;
    config.pool.generator_timeout_ms = 2_000;
    config.server.max_upload_bytes = 64 * 1024;
    config
}

pub async fn build_pipeline(
    backends: Vec<Arc<dyn Classifier>>,
    generators: Generators,
) -> DiagnosisPipeline {
    let registry = Arc::new(ClassifierRegistry::new(backends));
    registry.initialize_all().await;
    DiagnosisPipeline::new(&test_config(), registry, generators)
}

pub async fn build_app(
    backends: Vec<Arc<dyn Classifier>>,
    generators: Generators,
) -> axum::Router {
    let pipeline = Arc::new(build_pipeline(backends, generators).await);
    build_router(AppState::new(pipeline, Arc::new(test_config())))
}

/// Stand-in image bytes
pub fn image_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend(std::iter::repeat(0x42).take(256));
    bytes
}

/// Hand-built multipart body
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn file(mut self, file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        if let Some(content_type) = content_type {
            self.body
                .extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        self.body.extend_from_slice(b"\r\n");
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
