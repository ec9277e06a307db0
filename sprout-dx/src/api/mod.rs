//! HTTP API handlers for sprout-dx

pub mod detect;
pub mod health;
pub mod plant;
pub mod upload;

pub use detect::detect_routes;
pub use health::health_routes;
pub use plant::plant_routes;

use crate::AppState;
use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Service description returned by `GET /`
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// GET /
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "sprout-dx plant diagnosis",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "POST /api/detect",
            "POST /api/plant/analyze",
            "POST /api/plant/analyze-auto",
            "POST /api/plant/analyze/:backend",
            "POST /api/plant/compare",
            "GET /api/health",
        ],
    })
}

pub fn index_routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}
