//! Species analysis and model comparison responses

use crate::types::{CareGuide, GrowthPrediction, Identification};
use serde::Serialize;
use std::collections::BTreeMap;

/// `POST /api/plant/analyze*` response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub identification: Identification,
    pub care_guide: Option<CareGuide>,
    pub growth_prediction: Option<GrowthPrediction>,
    /// False when the plant could not be identified confidently
    pub success: bool,
    pub message: String,
    /// Backend id that produced the identification
    pub model: String,
    pub generator_errors: BTreeMap<String, String>,
}

/// `POST /api/plant/compare` response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResponse {
    pub success: bool,
    pub message: String,
    /// Backend id the arbitration rule selects
    pub chosen: String,
    /// Successful backends in configuration order
    pub models: Vec<ModelComparison>,
    pub failures: Vec<ModelFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelComparison {
    pub id: String,
    pub name: String,
    pub diagnosis_status: String,
    pub result: Identification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelFailure {
    pub id: String,
    pub name: String,
    pub error: String,
}
