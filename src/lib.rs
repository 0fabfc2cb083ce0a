pub mod api;
pub mod audit;
pub mod config;
pub mod models;
pub mod pipeline;

#[cfg(test)]
mod phi_audit;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{start_api_server, ApiContext};
use crate::audit::{AuditError, AuditStore, JsonFileAuditStore};
use crate::config::AppConfig;
use crate::pipeline::decision::{DecisionClient, DecisionError, OpenAiCompatClient};
use crate::pipeline::{ConfidenceGate, DecisionPipeline, InvalidThreshold};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid review threshold: {0}")]
    Threshold(#[from] InvalidThreshold),

    #[error("Model client setup failed: {0}")]
    Client(#[from] DecisionError),

    #[error("Audit log setup failed: {0}")]
    Audit(#[from] AuditError),

    #[error("Server failed: {0}")]
    Server(String),
}

/// Wire the pipeline from configuration. Blocking: builds the HTTP client
/// used for model calls, so call it off the async runtime.
pub fn build_pipeline(config: &AppConfig) -> Result<DecisionPipeline, StartupError> {
    let client: Arc<dyn DecisionClient> = Arc::new(OpenAiCompatClient::new(
        &config.base_url,
        config.api_key.clone(),
        &config.model,
        config.response_mode,
        config.timeout_secs,
    )?);
    let store: Arc<dyn AuditStore> = Arc::new(JsonFileAuditStore::open(&config.audit_log)?);
    let gate = ConfidenceGate::new(config.review_threshold)?;
    Ok(DecisionPipeline::new(client, store, gate))
}

async fn serve_until_ctrl_c(
    pipeline: Arc<DecisionPipeline>,
    config: &AppConfig,
) -> Result<(), StartupError> {
    let ctx = ApiContext::new(pipeline).with_cors_origins(config.cors_origins.clone());
    let server = start_api_server(ctx, config.bind)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }
    tracing::info!("Shutting down");
    server.stop().await;
    Ok(())
}

/// Run the service until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::SERVICE_NAME, config::APP_VERSION);

    let app_config = AppConfig::from_env()?;
    if app_config.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; model calls will be rejected by the provider");
    }
    tracing::info!(
        model = %app_config.model,
        base_url = %app_config.base_url,
        mode = app_config.response_mode.as_str(),
        threshold = app_config.review_threshold,
        audit_log = %app_config.audit_log.display(),
        timeout_secs = app_config.timeout_secs,
        "Configuration loaded"
    );

    let pipeline = {
        let app_config = app_config.clone();
        tokio::task::spawn_blocking(move || build_pipeline(&app_config))
            .await
            .map_err(|e| StartupError::Server(format!("startup task failed: {e}")))??
    };
    let pipeline = Arc::new(pipeline);

    let served = serve_until_ctrl_c(pipeline.clone(), &app_config).await;

    // The blocking HTTP client must not be dropped on a runtime thread.
    let _ = tokio::task::spawn_blocking(move || drop(pipeline)).await;

    served?;
    tracing::info!("{} stopped", config::SERVICE_NAME);
    Ok(())
}
