//! Diagnosis pipeline
//!
//! Wires the stages together:
//! image → classifier(s) → tiering → generator fan-out → assembled response
//!
//! [`DiagnosisPipeline`] is built once at startup with its collaborators
//! injected and shared by every request through `AppState`.

pub mod arbitrator;
pub mod assembler;
pub mod orchestrator;
pub mod pool;
pub mod tiering;

use crate::backends::ClassifierRegistry;
use crate::config::DxConfig;
use crate::types::{
    ArbitrationResult, ClassificationResult, ClassifierError, Identification, ImageBytes,
};
use arbitrator::{ArbitrationError, ModelArbitrator};
use orchestrator::{Generators, TaskOrchestrator, TaskOutcomes};
use pool::WorkerPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tiering::ConfidenceTierClassifier;
use tracing::info;

/// Pipeline error surfaced to the request boundary
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Arbitration(#[from] ArbitrationError),

    #[error("Unknown classifier backend '{0}'")]
    UnknownBackend(String),
}

/// Per-request options for the diagnosis path
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnoseOptions {
    /// Detections below this confidence are dropped
    pub conf_threshold: f64,
    pub user_notes: Option<String>,
    /// Also produce a care guide for Medium/High results
    pub include_care_guide: bool,
}

/// Which backend(s) serve a species analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesMode {
    /// Primary backend only
    Primary,
    /// Every backend, arbitrated
    Auto,
    /// A named backend
    Backend(String),
}

/// Outcome of a diagnosis request, before response assembly
#[derive(Debug, Clone)]
pub struct Diagnosis {
    pub backend_id: String,
    pub result: ClassificationResult,
    pub outcomes: TaskOutcomes,
}

/// Outcome of a species analysis, before response assembly
#[derive(Debug, Clone)]
pub struct SpeciesAnalysis {
    pub backend_id: String,
    pub identification: Identification,
    /// Identification too weak; generators ran for the generic subject
    pub generic: bool,
    pub outcomes: TaskOutcomes,
}

/// The assembled pipeline
pub struct DiagnosisPipeline {
    arbitrator: ModelArbitrator,
    orchestrator: TaskOrchestrator,
    tiers: ConfidenceTierClassifier,
    default_conf_threshold: f64,
}

impl DiagnosisPipeline {
    /// Build from validated configuration and injected collaborators
    pub fn new(config: &DxConfig, registry: Arc<ClassifierRegistry>, generators: Generators) -> Self {
        let pool = Arc::new(WorkerPool::new(config.pool.workers));
        let tiers = ConfidenceTierClassifier::new(config.tiers);

        info!(
            workers = pool.size(),
            backends = registry.len(),
            medium = config.tiers.medium,
            high = config.tiers.high,
            "Diagnosis pipeline ready"
        );

        Self {
            arbitrator: ModelArbitrator::new(
                registry,
                Arc::clone(&pool),
                tiers,
                config.pool.backend_timeout(),
            ),
            orchestrator: TaskOrchestrator::new(
                generators,
                pool,
                tiers,
                config.care_guide.generic_subject.clone(),
                config.pool.generator_timeout(),
            ),
            tiers,
            default_conf_threshold: config.server.default_conf_threshold,
        }
    }

    pub fn tiers(&self) -> &ConfidenceTierClassifier {
        &self.tiers
    }

    pub fn registry(&self) -> &ClassifierRegistry {
        self.arbitrator.registry()
    }

    pub fn default_conf_threshold(&self) -> f64 {
        self.default_conf_threshold
    }

    pub fn advisor_available(&self) -> bool {
        self.orchestrator.advisor_available()
    }

    /// `{backend id → loaded}` snapshot
    pub fn model_health(&self) -> BTreeMap<String, bool> {
        self.registry().health()
    }

    /// Classify with the primary backend, tier, run the tier's generators
    pub async fn diagnose(
        &self,
        image: ImageBytes,
        options: DiagnoseOptions,
    ) -> Result<Diagnosis, PipelineError> {
        let backend = self
            .registry()
            .primary()
            .cloned()
            .ok_or(ArbitrationError::NoBackends)?;

        let result = self
            .arbitrator
            .classify_with(&backend, image, options.conf_threshold)
            .await?;

        let plan = self.orchestrator.plan_diagnosis(
            &result,
            options.user_notes.as_deref(),
            options.include_care_guide,
        );
        let outcomes = self.orchestrator.execute(plan).await;

        info!(
            backend = backend.id(),
            tier = ?result.tier,
            max_confidence = result.max_confidence,
            detections = result.detections.len(),
            "Diagnosis complete"
        );

        Ok(Diagnosis {
            backend_id: backend.id().to_string(),
            result,
            outcomes,
        })
    }

    /// Identify the plant, then produce its care guide and growth prediction
    pub async fn analyze_species(
        &self,
        image: ImageBytes,
        mode: SpeciesMode,
    ) -> Result<SpeciesAnalysis, PipelineError> {
        let (backend_id, result) = match mode {
            SpeciesMode::Auto => {
                let chosen = self
                    .arbitrator
                    .arbitrate(image, self.default_conf_threshold)
                    .await?
                    .into_chosen();
                (chosen.backend_id, chosen.result)
            }
            SpeciesMode::Primary => {
                let backend = self
                    .registry()
                    .primary()
                    .cloned()
                    .ok_or(ArbitrationError::NoBackends)?;
                let result = self
                    .arbitrator
                    .classify_with(&backend, image, self.default_conf_threshold)
                    .await?;
                (backend.id().to_string(), result)
            }
            SpeciesMode::Backend(id) => {
                let backend = self
                    .registry()
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| PipelineError::UnknownBackend(id.clone()))?;
                let result = self
                    .arbitrator
                    .classify_with(&backend, image, self.default_conf_threshold)
                    .await?;
                (id, result)
            }
        };

        let identification = Identification::from_result(&result);
        let generic = self.tiers.below_generic_floor(identification.confidence);
        let plan = self
            .orchestrator
            .plan_species(&identification.plant_name, identification.confidence);
        let outcomes = self.orchestrator.execute(plan).await;

        info!(
            backend = %backend_id,
            plant = %identification.plant_name,
            confidence = identification.confidence,
            generic,
            "Species analysis complete"
        );

        Ok(SpeciesAnalysis {
            backend_id,
            identification,
            generic,
            outcomes,
        })
    }

    /// Run every backend and keep all candidates
    pub async fn compare(&self, image: ImageBytes) -> Result<ArbitrationResult, PipelineError> {
        Ok(self
            .arbitrator
            .arbitrate(image, self.default_conf_threshold)
            .await?)
    }
}

/// In-crate test doubles for classifiers and generators
#[cfg(test)]
pub(crate) mod mock {
    use crate::pipeline::tiering::ConfidenceTierClassifier;
    use crate::types::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Classifier returning fixed detections
    pub struct StaticClassifier {
        id: String,
        detections: Vec<Detection>,
        delay: Option<Duration>,
        loaded: AtomicBool,
    }

    impl StaticClassifier {
        pub fn new(id: &str, detections: Vec<Detection>) -> Self {
            Self {
                id: id.to_string(),
                detections,
                delay: None,
                loaded: AtomicBool::new(false),
            }
        }

        pub fn single(id: &str, subject: &str, label: &str, confidence: f64) -> Self {
            Self::new(
                id,
                vec![Detection::new(
                    label,
                    format!("{} {}", subject, label),
                    subject,
                    confidence,
                    BoundingBox::new(10.0, 20.0, 100.0, 80.0),
                )],
            )
        }

        pub fn empty(id: &str) -> Self {
            Self::new(id, Vec::new())
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait::async_trait]
    impl Classifier for StaticClassifier {
        fn id(&self) -> &str {
            &self.id
        }

        fn is_loaded(&self) -> bool {
            self.loaded.load(Ordering::SeqCst)
        }

        async fn load(&self) -> Result<(), ClassifierError> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn classify(&self, _image: &[u8]) -> Result<Vec<Detection>, ClassifierError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.detections.clone())
        }
    }

    /// Classifier that always fails
    pub struct FailingClassifier {
        id: String,
        error: ClassifierError,
    }

    impl FailingClassifier {
        pub fn unavailable(id: &str) -> Self {
            Self {
                id: id.to_string(),
                error: ClassifierError::unavailable(id, "model not loaded"),
            }
        }

        pub fn inference(id: &str) -> Self {
            Self {
                id: id.to_string(),
                error: ClassifierError::inference(id, "corrupt tensor"),
            }
        }
    }

    #[async_trait::async_trait]
    impl Classifier for FailingClassifier {
        fn id(&self) -> &str {
            &self.id
        }

        fn is_loaded(&self) -> bool {
            false
        }

        async fn load(&self) -> Result<(), ClassifierError> {
            Err(self.error.clone())
        }

        async fn classify(&self, _image: &[u8]) -> Result<Vec<Detection>, ClassifierError> {
            Err(self.error.clone())
        }
    }

    enum Behavior {
        Ok(String),
        Fail(String),
        Panic,
    }

    /// Treatment advisor with scripted behavior
    pub struct MockAdvisor {
        behavior: Behavior,
        delay: Option<Duration>,
    }

    impl MockAdvisor {
        pub fn ok(advice: &str) -> Self {
            Self {
                behavior: Behavior::Ok(advice.to_string()),
                delay: None,
            }
        }

        pub fn failing(reason: &str) -> Self {
            Self {
                behavior: Behavior::Fail(reason.to_string()),
                delay: None,
            }
        }

        pub fn panicking() -> Self {
            Self {
                behavior: Behavior::Panic,
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait::async_trait]
    impl TreatmentAdvisor for MockAdvisor {
        fn is_available(&self) -> bool {
            true
        }

        async fn advise(&self, request: &TreatmentRequest) -> Result<String, GeneratorError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.behavior {
                Behavior::Ok(advice) => {
                    Ok(format!("{} ({} / {})", advice, request.subject, request.issue))
                }
                Behavior::Fail(reason) => Err(GeneratorError::Failure(reason.clone())),
                Behavior::Panic => panic!("advisor crashed"),
            }
        }
    }

    /// Care guide generator echoing the plant name
    pub struct MockCareGuide {
        fail: bool,
        delay: Option<Duration>,
    }

    impl MockCareGuide {
        pub fn ok() -> Self {
            Self {
                fail: false,
                delay: None,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait::async_trait]
    impl CareGuideGenerator for MockCareGuide {
        async fn care_guide(&self, plant_name: &str) -> Result<CareGuide, GeneratorError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(GeneratorError::Failure("care guide backend down".into()));
            }
            Ok(CareGuide {
                watering: format!("Water {} weekly", plant_name),
                sunlight: "Bright indirect light".into(),
                temperature: "18-24C".into(),
                humidity: "Moderate".into(),
                fertilizer: "Monthly in spring".into(),
                soil: "Well-draining mix".into(),
                tips: vec![format!("Watch {} for pests", plant_name)],
            })
        }
    }

    /// Growth predictor returning one stage per plant
    pub struct MockGrowth {
        delay: Option<Duration>,
    }

    impl MockGrowth {
        pub fn ok() -> Self {
            Self { delay: None }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait::async_trait]
    impl GrowthPredictor for MockGrowth {
        async fn predict(&self, plant_name: &str) -> Result<GrowthPrediction, GeneratorError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(GrowthPrediction {
                stages: vec![GrowthStage {
                    stage: "current".into(),
                    timeframe: "Now".into(),
                    image_url: None,
                    description: format!("{} today", plant_name),
                }],
            })
        }
    }

    /// Text generator with a canned reply that records its last request
    pub struct MockText {
        reply: Result<String, GeneratorError>,
        available: bool,
        last: Mutex<Option<TextRequest>>,
    }

    impl MockText {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                available: true,
                last: Mutex::new(None),
            }
        }

        pub fn failing(reason: &str) -> Self {
            Self {
                reply: Err(GeneratorError::Failure(reason.to_string())),
                available: true,
                last: Mutex::new(None),
            }
        }

        pub fn unavailable() -> Self {
            Self {
                reply: Err(GeneratorError::Unavailable("no api key".to_string())),
                available: false,
                last: Mutex::new(None),
            }
        }

        pub fn last_request(&self) -> Option<TextRequest> {
            self.last.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl TextGenerator for MockText {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn generate(&self, request: &TextRequest) -> Result<String, GeneratorError> {
            *self.last.lock().unwrap() = Some(request.clone());
            self.reply.clone()
        }
    }

    /// Tiered result with a single detection
    pub fn detection_result(subject: &str, label: &str, confidence: f64) -> ClassificationResult {
        ConfidenceTierClassifier::default().classify(vec![Detection::new(
            label,
            format!("{} {}", subject, label),
            subject,
            confidence,
            BoundingBox::default(),
        )])
    }
}
