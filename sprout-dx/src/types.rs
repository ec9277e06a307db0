//! Core Types and Trait Definitions for sprout-dx
//!
//! Defines the data model shared by every pipeline stage and the trait seams
//! to external collaborators:
//! - **Classifier:** scoring backends that turn image bytes into detections
//! - **Generators:** treatment advisor, care guide, growth predictor
//! - **TextGenerator:** opaque natural-language backend used by generators
//!
//! # Data flow
//! image bytes → Classifier → `Vec<Detection>` → `ClassificationResult`
//! (tiered) → generator fan-out → `GeneratorOutcome`s → response

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Shared, immutable image payload handed to concurrent backends
pub type ImageBytes = Arc<[u8]>;

// ============================================================================
// Detections and classification
// ============================================================================

/// Bounding region of a detection in image pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// One scored subject/issue prediction produced by a classifier
///
/// Immutable once created. Confidence is clamped to `[0, 1]`; a NaN score
/// from a misbehaving backend is treated as 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Short issue label (e.g. "Early blight")
    pub label: String,
    /// Backend-native full label (e.g. "Tomato Early blight leaf")
    pub full_label: String,
    /// Subject (plant species) this detection refers to
    pub subject_hint: String,
    /// Normalized confidence (0.0-1.0)
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

impl Detection {
    pub fn new(
        label: impl Into<String>,
        full_label: impl Into<String>,
        subject_hint: impl Into<String>,
        confidence: f64,
        bounding_box: BoundingBox,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            label: label.into(),
            full_label: full_label.into(),
            subject_hint: subject_hint.into(),
            confidence,
            bounding_box,
        }
    }

    /// Display name of the subject, falling back to the label
    pub fn subject_name(&self) -> &str {
        if self.subject_hint.trim().is_empty() {
            &self.label
        } else {
            &self.subject_hint
        }
    }
}

/// Discrete diagnostic tier derived from the maximum detection confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisTier {
    /// Nothing detected
    None,
    /// Unusable image quality
    Low,
    /// Tentative match, needs confirmation
    Medium,
    /// Actionable diagnosis
    High,
}

impl DiagnosisTier {
    /// Externally visible `diagnosis_status` value
    pub fn status(&self) -> &'static str {
        match self {
            DiagnosisTier::None => "no_detection",
            DiagnosisTier::Low => "low_confidence",
            DiagnosisTier::Medium => "medium_confidence",
            DiagnosisTier::High => "high_confidence",
        }
    }
}

/// Tiered output of a single classifier for a single request
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Detections ordered by descending confidence
    pub detections: Vec<Detection>,
    /// Highest confidence across detections (0.0 when empty)
    pub max_confidence: f64,
    pub tier: DiagnosisTier,
    /// Resolved subject of the top detection, if any
    pub subject_name: Option<String>,
}

impl ClassificationResult {
    /// Highest-confidence detection
    pub fn top(&self) -> Option<&Detection> {
        self.detections.first()
    }
}

/// One successful backend run inside arbitration
#[derive(Debug, Clone)]
pub struct ArbitrationCandidate {
    pub backend_id: String,
    pub display_name: String,
    pub result: ClassificationResult,
}

/// A backend that contributed no candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub backend_id: String,
    pub display_name: String,
    pub error: String,
}

/// Outcome of running every configured backend over the same image
///
/// `candidates` is keyed by backend id and kept in configuration order, so
/// comparison responses list backends the way operators configured them.
#[derive(Debug, Clone)]
pub struct ArbitrationResult {
    /// Index into `candidates` of the winner
    chosen_index: usize,
    pub candidates: Vec<ArbitrationCandidate>,
    pub failures: Vec<BackendFailure>,
}

impl ArbitrationResult {
    /// Build a result; `chosen_index` must point into `candidates`
    pub(crate) fn new(
        chosen_index: usize,
        candidates: Vec<ArbitrationCandidate>,
        failures: Vec<BackendFailure>,
    ) -> Self {
        debug_assert!(chosen_index < candidates.len());
        Self {
            chosen_index,
            candidates,
            failures,
        }
    }

    pub fn chosen(&self) -> &ArbitrationCandidate {
        &self.candidates[self.chosen_index]
    }

    /// Look up a candidate by backend id
    pub fn candidate(&self, backend_id: &str) -> Option<&ArbitrationCandidate> {
        self.candidates.iter().find(|c| c.backend_id == backend_id)
    }

    /// Consume and keep only the winning result
    pub fn into_chosen(mut self) -> ArbitrationCandidate {
        self.candidates.swap_remove(self.chosen_index)
    }
}

/// Species-level identification derived from a classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identification {
    pub plant_name: String,
    pub scientific_name: Option<String>,
    pub confidence: f64,
    pub common_names: Vec<String>,
}

impl Identification {
    /// Name used when no detection is available
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn from_result(result: &ClassificationResult) -> Self {
        let Some(top) = result.top() else {
            return Self {
                plant_name: Self::UNKNOWN.to_string(),
                scientific_name: None,
                confidence: 0.0,
                common_names: Vec::new(),
            };
        };

        let plant_name = top.subject_name().to_string();
        let scientific_name = (!top.full_label.is_empty() && top.full_label != plant_name)
            .then(|| top.full_label.clone());

        let mut common_names = Vec::new();
        if top.label != plant_name {
            common_names.push(top.label.clone());
        }

        Self {
            plant_name,
            scientific_name,
            confidence: result.max_confidence,
            common_names,
        }
    }
}

// ============================================================================
// Generator outputs
// ============================================================================

/// Plant care guide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareGuide {
    pub watering: String,
    pub sunlight: String,
    pub temperature: String,
    pub humidity: String,
    pub fertilizer: String,
    pub soil: String,
    pub tips: Vec<String>,
}

/// One stage of a growth prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthStage {
    /// Machine-readable stage key ("current", "1_month", ...)
    pub stage: String,
    /// Human-readable timeframe
    pub timeframe: String,
    pub image_url: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthPrediction {
    pub stages: Vec<GrowthStage>,
}

/// Input to the treatment advisor
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentRequest {
    pub subject: String,
    pub issue: String,
    pub confidence: f64,
    pub user_notes: Option<String>,
}

/// Result of one generator task
///
/// `value` is present exactly when `succeeded` is true. The only way to
/// build an outcome is through [`GeneratorOutcome::success`] and
/// [`GeneratorOutcome::failure`], which keeps that pairing intact.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOutcome<T> {
    value: Option<T>,
    error_summary: Option<String>,
}

impl<T> GeneratorOutcome<T> {
    pub fn success(value: T) -> Self {
        Self {
            value: Some(value),
            error_summary: None,
        }
    }

    pub fn failure(error: &GeneratorError) -> Self {
        Self {
            value: None,
            error_summary: Some(error.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    pub fn error_summary(&self) -> Option<&str> {
        self.error_summary.as_deref()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Classifier backend error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassifierError {
    /// Model not loaded or backend unreachable
    #[error("Backend '{backend}' unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// Malformed input or internal backend error
    #[error("Inference failed on '{backend}': {reason}")]
    InferenceFailure { backend: String, reason: String },
}

impl ClassifierError {
    pub fn unavailable(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    pub fn inference(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InferenceFailure {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

/// Generator task error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// Generator backend not configured (e.g. missing API key)
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    /// Generator ran and failed
    #[error("Generator failed: {0}")]
    Failure(String),

    /// Generator exceeded its time budget
    #[error("Generator '{generator}' timed out after {timeout_ms} ms")]
    Timeout { generator: String, timeout_ms: u64 },
}

// ============================================================================
// Trait seams
// ============================================================================

/// Scoring backend
///
/// Implementations must be safe for concurrent calls and must not keep
/// per-request mutable state. Returned detections may be in any order;
/// the pipeline sorts them.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// Stable backend identifier used in config and responses
    fn id(&self) -> &str;

    /// Human-readable backend name
    fn display_name(&self) -> &str {
        self.id()
    }

    /// Whether one-time initialization has completed
    fn is_loaded(&self) -> bool;

    /// One-time initialization; repeated calls after success are no-ops
    async fn load(&self) -> Result<(), ClassifierError>;

    async fn classify(&self, image: &[u8]) -> Result<Vec<Detection>, ClassifierError>;
}

/// Treatment advice generator (HIGH tier only)
#[async_trait::async_trait]
pub trait TreatmentAdvisor: Send + Sync {
    /// Whether the advisor has a usable backend configured
    fn is_available(&self) -> bool;

    async fn advise(&self, request: &TreatmentRequest) -> Result<String, GeneratorError>;
}

/// Care guide generator keyed on plant name
#[async_trait::async_trait]
pub trait CareGuideGenerator: Send + Sync {
    async fn care_guide(&self, plant_name: &str) -> Result<CareGuide, GeneratorError>;
}

/// Growth prediction generator keyed on plant name
#[async_trait::async_trait]
pub trait GrowthPredictor: Send + Sync {
    async fn predict(&self, plant_name: &str) -> Result<GrowthPrediction, GeneratorError>;
}

/// Request to a natural-language backend
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Opaque natural-language generation backend
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn is_available(&self) -> bool;

    async fn generate(&self, request: &TextRequest) -> Result<String, GeneratorError>;
}
