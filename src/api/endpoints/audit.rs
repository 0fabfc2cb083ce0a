//! `GET /audit`: the full audit trail.

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::AuditEntry;

/// Every recorded entry in append order; `[]` before the first case.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let pipeline = ctx.pipeline.clone();
    let entries = tokio::task::spawn_blocking(move || pipeline.list_entries())
        .await
        .map_err(|e| ApiError::Internal(format!("audit read task failed: {e}")))??;

    tracing::debug!(count = entries.len(), "Audit trail read");
    Ok(Json(entries))
}
