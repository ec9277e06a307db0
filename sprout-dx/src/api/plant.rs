//! Species identification endpoints
//!
//! All accept a multipart `file` that must be an image (by content type or
//! extension) no larger than the configured upload cap.

use axum::{
    extract::{Multipart, Path, State},
    routing::post,
    Json, Router,
};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::api::upload::UploadForm;
use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisResponse, ComparisonResponse};
use crate::pipeline::assembler::ResponseAssembler;
use crate::pipeline::SpeciesMode;
use crate::types::ImageBytes;
use crate::AppState;

async fn read_image(state: &AppState, multipart: Multipart) -> ApiResult<ImageBytes> {
    let max_bytes = state.config.server.max_upload_bytes;
    UploadForm::read(multipart, max_bytes)
        .await?
        .image_content(max_bytes)
}

async fn analyze_with(
    state: AppState,
    multipart: Multipart,
    mode: SpeciesMode,
) -> ApiResult<Json<AnalysisResponse>> {
    let image = read_image(&state, multipart).await?;
    let span = tracing::info_span!("analyze", request_id = %Uuid::new_v4(), mode = ?mode);

    async move {
        info!(bytes = image.len(), "Species analysis request");
        let analysis = state.pipeline.analyze_species(image, mode.clone()).await?;
        Ok::<_, ApiError>(Json(ResponseAssembler::species(&analysis, &mode)))
    }
    .instrument(span)
    .await
}

/// POST /api/plant/analyze (primary backend)
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisResponse>> {
    analyze_with(state, multipart, SpeciesMode::Primary).await
}

/// POST /api/plant/analyze-auto (every backend, best result wins)
pub async fn analyze_auto(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisResponse>> {
    analyze_with(state, multipart, SpeciesMode::Auto).await
}

/// POST /api/plant/analyze/:backend
pub async fn analyze_backend(
    State(state): State<AppState>,
    Path(backend): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisResponse>> {
    analyze_with(state, multipart, SpeciesMode::Backend(backend)).await
}

/// POST /api/plant/compare
pub async fn compare(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ComparisonResponse>> {
    let image = read_image(&state, multipart).await?;
    let span = tracing::info_span!("compare", request_id = %Uuid::new_v4());

    async move {
        info!(bytes = image.len(), "Model comparison request");
        let arbitration = state.pipeline.compare(image).await?;
        Ok::<_, ApiError>(Json(ResponseAssembler::comparison(&arbitration)))
    }
    .instrument(span)
    .await
}

pub fn plant_routes() -> Router<AppState> {
    Router::new()
        .route("/api/plant/analyze", post(analyze))
        .route("/api/plant/analyze-auto", post(analyze_auto))
        .route("/api/plant/analyze/:backend", post(analyze_backend))
        .route("/api/plant/compare", post(compare))
}
