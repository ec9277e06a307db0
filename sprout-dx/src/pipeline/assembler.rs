//! Response assembly
//!
//! Deterministic mapping from pipeline outcomes to response models. Never
//! fails: a missing or failed generator output becomes `null` plus an entry
//! in `generator_errors`.

use crate::models::{
    round4, AnalysisResponse, ComparisonResponse, DetectionView, DiagnosisResponse,
    ModelComparison, ModelFailure, SpeciesSummary,
};
use crate::pipeline::orchestrator::TaskOutcomes;
use crate::pipeline::{Diagnosis, SpeciesAnalysis, SpeciesMode};
use crate::types::{ArbitrationResult, ClassificationResult, DiagnosisTier, Identification};
use std::collections::BTreeMap;

pub const HIGH_CONFIDENCE_MESSAGE: &str = "Diagnosis complete with high confidence.";

pub const LOW_CONFIDENCE_MESSAGE: &str = "The photo is unclear or the plant could not be \
    recognized. Retry with a sharper photo, with a leaf of the target plant centered in the frame.";

pub const NO_DETECTION_MESSAGE: &str =
    "No plant leaf was detected. Retake the photo so the leaves are clearly visible.";

pub const GENERIC_SPECIES_MESSAGE: &str = "The plant could not be identified with confidence. \
    A general houseplant care guide is provided instead; upload a clearer image for \
    plant-specific information.";

/// Builds response models
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    /// Status message for a tier; Medium names the best guess and its score
    pub fn status_message(result: &ClassificationResult) -> String {
        match (result.tier, result.top()) {
            (DiagnosisTier::High, _) => HIGH_CONFIDENCE_MESSAGE.to_string(),
            (DiagnosisTier::Medium, Some(top)) => format!(
                "A definitive diagnosis is not possible. The most likely match is {} on {} \
                 ({:.1}%). Take a sharper photo or zoom in on a single leaf and try again.",
                top.label,
                top.subject_name(),
                result.max_confidence * 100.0
            ),
            (DiagnosisTier::Low, _) => LOW_CONFIDENCE_MESSAGE.to_string(),
            _ => NO_DETECTION_MESSAGE.to_string(),
        }
    }

    pub fn diagnosis(diagnosis: &Diagnosis) -> DiagnosisResponse {
        let result = &diagnosis.result;

        let treatment_advice = diagnosis
            .outcomes
            .treatment
            .as_ref()
            .and_then(|o| o.value())
            .cloned();
        let care_guide = diagnosis
            .outcomes
            .care_guide
            .as_ref()
            .and_then(|o| o.value())
            .cloned();

        let species = match result.top() {
            Some(top) => SpeciesSummary {
                name: top.subject_name().to_string(),
                confidence: round4(top.confidence),
            },
            None => SpeciesSummary {
                name: Identification::UNKNOWN.to_string(),
                confidence: 0.0,
            },
        };

        let detections = result
            .detections
            .iter()
            .map(|d| DetectionView {
                name: d.label.clone(),
                full_name: if d.full_label.is_empty() {
                    d.label.clone()
                } else {
                    d.full_label.clone()
                },
                subject: d.subject_hint.clone(),
                confidence: round4(d.confidence),
                bbox: d.bounding_box,
            })
            .collect::<Vec<_>>();

        DiagnosisResponse {
            success: true,
            diagnosis_status: result.tier.status().to_string(),
            max_confidence: round4(result.max_confidence),
            detection_count: detections.len(),
            species,
            detections,
            status_message: Self::status_message(result),
            advisor_enabled: treatment_advice.is_some(),
            treatment_advice,
            care_guide,
            generator_errors: generator_errors(&diagnosis.outcomes),
            model: diagnosis.backend_id.clone(),
        }
    }

    pub fn species(analysis: &SpeciesAnalysis, mode: &SpeciesMode) -> AnalysisResponse {
        let mut identification = analysis.identification.clone();
        identification.confidence = round4(identification.confidence);

        let message = if analysis.generic {
            GENERIC_SPECIES_MESSAGE.to_string()
        } else {
            let suffix = match mode {
                SpeciesMode::Primary => String::new(),
                SpeciesMode::Auto => format!(" (auto-selected model: {})", analysis.backend_id),
                SpeciesMode::Backend(id) => format!(" ({} model)", id),
            };
            format!("{} analysis complete.{}", identification.plant_name, suffix)
        };

        AnalysisResponse {
            identification,
            care_guide: analysis
                .outcomes
                .care_guide
                .as_ref()
                .and_then(|o| o.value())
                .cloned(),
            growth_prediction: analysis
                .outcomes
                .growth
                .as_ref()
                .and_then(|o| o.value())
                .cloned(),
            success: !analysis.generic,
            message,
            model: analysis.backend_id.clone(),
            generator_errors: generator_errors(&analysis.outcomes),
        }
    }

    pub fn comparison(arbitration: &ArbitrationResult) -> ComparisonResponse {
        let models = arbitration
            .candidates
            .iter()
            .map(|c| {
                let mut result = Identification::from_result(&c.result);
                result.confidence = round4(result.confidence);
                ModelComparison {
                    id: c.backend_id.clone(),
                    name: c.display_name.clone(),
                    diagnosis_status: c.result.tier.status().to_string(),
                    result,
                }
            })
            .collect::<Vec<_>>();

        let failures = arbitration
            .failures
            .iter()
            .map(|f| ModelFailure {
                id: f.backend_id.clone(),
                name: f.display_name.clone(),
                error: f.error.clone(),
            })
            .collect();

        ComparisonResponse {
            success: true,
            message: format!("Analysis complete for {} model(s).", models.len()),
            chosen: arbitration.chosen().backend_id.clone(),
            models,
            failures,
        }
    }
}

fn generator_errors(outcomes: &TaskOutcomes) -> BTreeMap<String, String> {
    outcomes
        .failures()
        .into_iter()
        .map(|(name, summary)| (name.to_string(), summary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::mock::detection_result;
    use crate::types::{GeneratorError, GeneratorOutcome};

    fn diagnosis(result: ClassificationResult, outcomes: TaskOutcomes) -> Diagnosis {
        Diagnosis {
            backend_id: "vit".into(),
            result,
            outcomes,
        }
    }

    #[test]
    fn test_high_with_advice() {
        let outcomes = TaskOutcomes {
            treatment: Some(GeneratorOutcome::success("Apply copper fungicide".to_string())),
            ..Default::default()
        };
        let response = ResponseAssembler::diagnosis(&diagnosis(
            detection_result("Tomato", "Early blight", 0.912345),
            outcomes,
        ));

        assert!(response.success);
        assert_eq!(response.diagnosis_status, "high_confidence");
        assert_eq!(response.max_confidence, 0.9123);
        assert_eq!(response.status_message, HIGH_CONFIDENCE_MESSAGE);
        assert_eq!(response.treatment_advice.as_deref(), Some("Apply copper fungicide"));
        assert!(response.advisor_enabled);
        assert_eq!(response.species.name, "Tomato");
        assert_eq!(response.detections[0].full_name, "Tomato Early blight");
        assert!(response.generator_errors.is_empty());
    }

    #[test]
    fn test_high_with_failed_advisor() {
        let outcomes = TaskOutcomes {
            treatment: Some(GeneratorOutcome::failure(&GeneratorError::Failure(
                "rate limited".into(),
            ))),
            ..Default::default()
        };
        let response = ResponseAssembler::diagnosis(&diagnosis(
            detection_result("Tomato", "Early blight", 0.91),
            outcomes,
        ));

        assert!(response.success);
        assert!(response.treatment_advice.is_none());
        assert!(!response.advisor_enabled);
        assert!(response.generator_errors["treatment_advice"].contains("rate limited"));
    }

    #[test]
    fn test_medium_message_names_best_guess() {
        let result = detection_result("Tomato", "Leaf mold", 0.3456);
        let message = ResponseAssembler::status_message(&result);
        assert!(message.contains("Leaf mold"));
        assert!(message.contains("Tomato"));
        assert!(message.contains("(34.6%)"));
    }

    #[test]
    fn test_no_detection_serializes_nulls() {
        let empty = crate::pipeline::tiering::ConfidenceTierClassifier::default().classify(vec![]);
        let response = ResponseAssembler::diagnosis(&diagnosis(empty, TaskOutcomes::default()));

        assert_eq!(response.diagnosis_status, "no_detection");
        assert_eq!(response.species.name, "Unknown");
        assert_eq!(response.status_message, NO_DETECTION_MESSAGE);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["treatment_advice"].is_null());
        assert!(json["care_guide"].is_null());
        assert_eq!(json["detection_count"], 0);
    }

    #[test]
    fn test_low_message() {
        let result = detection_result("Tomato", "Leaf mold", 0.12);
        assert_eq!(ResponseAssembler::status_message(&result), LOW_CONFIDENCE_MESSAGE);
    }

    #[test]
    fn test_species_generic_is_unsuccessful() {
        let analysis = SpeciesAnalysis {
            backend_id: "vit".into(),
            identification: Identification::from_result(&detection_result("Fern", "Fern", 0.05)),
            generic: true,
            outcomes: TaskOutcomes::default(),
        };
        let response = ResponseAssembler::species(&analysis, &SpeciesMode::Primary);
        assert!(!response.success);
        assert_eq!(response.message, GENERIC_SPECIES_MESSAGE);
        assert!(response.care_guide.is_none());
    }

    #[test]
    fn test_species_message_names_mode() {
        let analysis = SpeciesAnalysis {
            backend_id: "plantrecog".into(),
            identification: Identification::from_result(&detection_result("Rose", "Rose", 0.8)),
            generic: false,
            outcomes: TaskOutcomes::default(),
        };
        let auto = ResponseAssembler::species(&analysis, &SpeciesMode::Auto);
        assert!(auto.success);
        assert_eq!(auto.message, "Rose analysis complete. (auto-selected model: plantrecog)");

        let named =
            ResponseAssembler::species(&analysis, &SpeciesMode::Backend("plantrecog".into()));
        assert_eq!(named.message, "Rose analysis complete. (plantrecog model)");
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let build = || {
            ResponseAssembler::diagnosis(&diagnosis(
                detection_result("Tomato", "Leaf mold", 0.4),
                TaskOutcomes::default(),
            ))
        };
        assert_eq!(build(), build());
    }
}
