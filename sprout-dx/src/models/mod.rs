//! Externally visible response models for sprout-dx
//!
//! Produced only by the pipeline's response assembler. Absent generator
//! output is serialized as an explicit `null`, never omitted.

pub mod analysis;
pub mod diagnosis;

pub use analysis::{AnalysisResponse, ComparisonResponse, ModelComparison, ModelFailure};
pub use diagnosis::{DetectionView, DiagnosisResponse, SpeciesSummary};

/// Round a confidence to 4 decimal places for display
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
