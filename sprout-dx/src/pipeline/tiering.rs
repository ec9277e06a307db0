//! Confidence tiering
//!
//! Maps the maximum detection confidence of a request onto a
//! [`DiagnosisTier`]. Pure and deterministic: no I/O, no state.
//!
//! ```text
//! max == 0                 → None
//! 0      < max < medium    → Low
//! medium ≤ max < high      → Medium
//! high   ≤ max             → High
//! ```
//!
//! Each band includes its lower bound, so the bands partition `[0, 1]`.

use crate::config::ConfigError;
use crate::types::{ClassificationResult, DiagnosisTier, Detection};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Tier boundaries and the species generic-subject floor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Lower bound (inclusive) of the Medium band
    pub medium: f64,
    /// Lower bound (inclusive) of the High band
    pub high: f64,
    /// Species identifications below this use the generic subject
    pub generic_floor: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            medium: 0.20,
            high: 0.55,
            generic_floor: 0.10,
        }
    }
}

impl TierThresholds {
    /// Require `0 < medium < high <= 1` and `0 <= generic_floor <= 1`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.medium > 0.0 && self.medium < self.high && self.high <= 1.0;
        if !ordered {
            return Err(ConfigError::Invalid(format!(
                "tier thresholds must satisfy 0 < medium < high <= 1 (medium={}, high={})",
                self.medium, self.high
            )));
        }
        if !(0.0..=1.0).contains(&self.generic_floor) {
            return Err(ConfigError::Invalid(format!(
                "tiers.generic_floor must be within [0, 1], got {}",
                self.generic_floor
            )));
        }
        Ok(())
    }
}

/// Assigns tiers and builds [`ClassificationResult`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceTierClassifier {
    thresholds: TierThresholds,
}

impl ConfidenceTierClassifier {
    pub fn new(thresholds: TierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    /// Tier for a maximum confidence value
    pub fn tier(&self, max_confidence: f64) -> DiagnosisTier {
        // NaN and negatives collapse to "nothing detected"
        if max_confidence.is_nan() || max_confidence <= 0.0 {
            DiagnosisTier::None
        } else if max_confidence < self.thresholds.medium {
            DiagnosisTier::Low
        } else if max_confidence < self.thresholds.high {
            DiagnosisTier::Medium
        } else {
            DiagnosisTier::High
        }
    }

    /// Sort detections, compute the maximum confidence and assign the tier
    pub fn classify(&self, mut detections: Vec<Detection>) -> ClassificationResult {
        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        let max_confidence = detections.first().map(|d| d.confidence).unwrap_or(0.0);
        let subject_name = detections.first().map(|d| d.subject_name().to_string());

        ClassificationResult {
            tier: self.tier(max_confidence),
            detections,
            max_confidence,
            subject_name,
        }
    }

    /// Whether a species identification is too weak to name the plant
    pub fn below_generic_floor(&self, confidence: f64) -> bool {
        confidence < self.thresholds.generic_floor
    }
}
