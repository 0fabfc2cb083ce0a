use std::net::SocketAddr;
use std::path::PathBuf;

use crate::pipeline::decision::{ResponseMode, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::pipeline::DEFAULT_REVIEW_THRESHOLD;

/// Application-level constants
pub const SERVICE_NAME: &str = "Auto-Auth Backend";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_AUDIT_LOG: &str = "data/audit_log.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default tracing filter (overridden by `RUST_LOG`).
pub fn default_log_filter() -> &'static str {
    "auto_auth=info"
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} is not a valid value: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Runtime configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub response_mode: ResponseMode,
    pub review_threshold: f64,
    pub audit_log: PathBuf,
    pub timeout_secs: u64,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`. Unset and blank variables take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("AUTO_AUTH_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("AUTO_AUTH_BIND", &bind_raw, e))?;

        let response_mode = match get("AUTO_AUTH_RESPONSE_MODE") {
            Some(raw) => raw
                .parse::<ResponseMode>()
                .map_err(|e| ConfigError::invalid("AUTO_AUTH_RESPONSE_MODE", &raw, e))?,
            None => ResponseMode::Structured,
        };

        let review_threshold = match get("AUTO_AUTH_REVIEW_THRESHOLD") {
            Some(raw) => {
                let value = raw
                    .parse::<f64>()
                    .map_err(|e| ConfigError::invalid("AUTO_AUTH_REVIEW_THRESHOLD", &raw, e))?;
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::invalid(
                        "AUTO_AUTH_REVIEW_THRESHOLD",
                        &raw,
                        "must lie in [0, 1]",
                    ));
                }
                value
            }
            None => DEFAULT_REVIEW_THRESHOLD,
        };

        let timeout_secs = match get("AUTO_AUTH_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::invalid(
                        "AUTO_AUTH_TIMEOUT_SECS",
                        &raw,
                        "must be at least 1",
                    ))
                }
                Ok(secs) => secs,
                Err(e) => return Err(ConfigError::invalid("AUTO_AUTH_TIMEOUT_SECS", &raw, e)),
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let cors_origins = get("AUTO_AUTH_CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();

        Ok(Self {
            bind,
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("AUTO_AUTH_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            response_mode,
            review_threshold,
            audit_log: get("AUTO_AUTH_AUDIT_LOG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_LOG)),
            timeout_secs,
            cors_origins,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            response_mode: ResponseMode::Structured,
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cors_origins: Vec::new(),
        }
    }
}

/// Comma-separated origins; `*` anywhere means any origin (empty list).
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}
