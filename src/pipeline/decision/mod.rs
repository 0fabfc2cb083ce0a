pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use openai::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

/// Longest provider error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("Model provider is not reachable at {0}")]
    ProviderConnection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Model provider rejected credentials (status {status})")]
    Authentication { status: u16 },

    #[error("Model provider returned error (status {status}): {body}")]
    ProviderError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model response could not be interpreted: {0}")]
    GarbledResponse(String),
}

impl DecisionError {
    /// Provider error with the body cut down to a loggable size.
    pub fn provider(status: u16, body: &str) -> Self {
        let body = if body.chars().count() > MAX_ERROR_BODY_CHARS {
            let cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            format!("{cut}…")
        } else {
            body.to_string()
        };
        Self::ProviderError { status, body }
    }

    /// Short label for logs. Carries no provider body or model text.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderConnection(_) => "provider_connection",
            Self::Timeout(_) => "timeout",
            Self::Authentication { .. } => "authentication",
            Self::ProviderError { .. } => "provider_error",
            Self::HttpClient(_) => "http_client",
            Self::MalformedProviderResponse(_) => "malformed_provider_response",
            Self::EmptyResponse => "empty_response",
            Self::GarbledResponse(_) => "garbled_response",
        }
    }

    /// HTTP status returned by the provider, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status } | Self::ProviderError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
