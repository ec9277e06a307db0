//! Disease diagnosis endpoint

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::api::upload::{parse_conf_threshold, parse_flag, UploadForm};
use crate::error::{ApiError, ApiResult};
use crate::models::DiagnosisResponse;
use crate::pipeline::assembler::ResponseAssembler;
use crate::pipeline::DiagnoseOptions;
use crate::AppState;

/// POST /api/detect
///
/// Multipart form:
/// - `file`: image (.jpg, .jpeg, .png, .bmp, .webp)
/// - `conf_threshold`: optional, within [0, 1]
/// - `user_notes`: optional free text passed to the treatment advisor
/// - `include_care_guide`: optional flag
pub async fn detect(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<DiagnosisResponse>> {
    let request_id = Uuid::new_v4();
    let max_bytes = state.config.server.max_upload_bytes;

    let form = UploadForm::read(multipart, max_bytes).await?;
    let image = form.image(max_bytes)?;
    let options = DiagnoseOptions {
        conf_threshold: parse_conf_threshold(
            form.field("conf_threshold"),
            state.pipeline.default_conf_threshold(),
        )?,
        user_notes: form.field("user_notes").map(str::to_string),
        include_care_guide: parse_flag("include_care_guide", form.field("include_care_guide"))?,
    };

    let span = tracing::info_span!("detect", %request_id);
    async move {
        info!(
            file = form.file_name.as_deref().unwrap_or("<unnamed>"),
            bytes = image.len(),
            conf_threshold = options.conf_threshold,
            "Diagnosis request"
        );

        let diagnosis = state.pipeline.diagnose(image, options).await?;
        Ok::<_, ApiError>(Json(ResponseAssembler::diagnosis(&diagnosis)))
    }
    .instrument(span)
    .await
}

pub fn detect_routes() -> Router<AppState> {
    Router::new().route("/api/detect", post(detect))
}
