//! `POST /analyze`: run one case through the decision pipeline.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{AnalysisRequest, AuditEntry};
use crate::pipeline::PipelineError;

/// Returns the recorded `AuditEntry`. Any pipeline failure is a 500 and
/// leaves no entry behind.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AuditEntry>, ApiError> {
    let Json(request) = payload?;

    let pipeline = ctx.pipeline.clone();
    let entry = tokio::task::spawn_blocking(move || pipeline.analyze(&request))
        .await
        .map_err(|e| PipelineError::Aborted(e.to_string()))??;

    Ok(Json(entry))
}
