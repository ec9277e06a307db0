//! `POST /api/detect` response

use crate::types::{BoundingBox, CareGuide};
use serde::Serialize;
use std::collections::BTreeMap;

/// Diagnosis response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResponse {
    pub success: bool,
    /// One of `high_confidence`, `medium_confidence`, `low_confidence`, `no_detection`
    pub diagnosis_status: String,
    pub max_confidence: f64,
    pub detection_count: usize,
    pub species: SpeciesSummary,
    /// Ordered by descending confidence
    pub detections: Vec<DetectionView>,
    pub status_message: String,
    /// Present only for high confidence results with a working advisor
    pub treatment_advice: Option<String>,
    pub advisor_enabled: bool,
    /// Requested with `include_care_guide`; Medium/High only
    pub care_guide: Option<CareGuide>,
    /// Generator name → error summary for degraded fields
    pub generator_errors: BTreeMap<String, String>,
    /// Backend id that produced the detections
    pub model: String,
}

/// Top subject of a diagnosis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesSummary {
    pub name: String,
    pub confidence: f64,
}

/// One detection as shown to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionView {
    pub name: String,
    pub full_name: String,
    pub subject: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}
