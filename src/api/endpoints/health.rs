//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::config::{APP_VERSION, SERVICE_NAME};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health` and `GET /`. Never touches the model or the audit log.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online",
        service: SERVICE_NAME,
        version: APP_VERSION,
        model: ctx.pipeline.model_id().to_string(),
        timestamp: Utc::now(),
    })
}
