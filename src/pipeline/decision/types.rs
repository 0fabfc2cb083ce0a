use serde::{Deserialize, Serialize};

use super::DecisionError;
use crate::models::{InvalidEnumValue, ModelDecision};

/// Which output contract the model is asked to honour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Schema-constrained tool call; arguments are the decision triple.
    Structured,
    /// Plain text with `DECISION:` / `CONFIDENCE:` / `REASON:` markers.
    FreeText,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::FreeText => "free_text",
        }
    }
}

impl std::str::FromStr for ResponseMode {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "free_text" | "free-text" | "freetext" => Ok(Self::FreeText),
            _ => Err(InvalidEnumValue {
                field: "ResponseMode",
                value: s.into(),
            }),
        }
    }
}

/// What came back from the model, before any interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelResponse {
    /// JSON arguments of the decision tool call, as sent by the provider.
    Structured { arguments: String },
    /// Assistant message text.
    FreeText { content: String },
}

impl RawModelResponse {
    /// The shape this response actually has, regardless of what was asked for.
    pub fn shape(&self) -> ResponseMode {
        match self {
            Self::Structured { .. } => ResponseMode::Structured,
            Self::FreeText { .. } => ResponseMode::FreeText,
        }
    }
}

/// Canonical `{decision, reason, confidence}` produced by parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTriple {
    pub decision: ModelDecision,
    pub reason: String,
    /// Always within [0, 1] once produced by the parser.
    pub confidence: f64,
}

/// External decision engine (allows mocking).
///
/// One blocking round-trip per call. Implementations must not retry:
/// any transport, authentication or provider failure is returned as-is.
pub trait DecisionClient: Send + Sync {
    fn invoke(
        &self,
        policy: &str,
        redacted_text: &str,
    ) -> Result<RawModelResponse, DecisionError>;

    /// Model identifier reported by the health endpoint.
    fn model_id(&self) -> &str;

    /// The output contract this client requests.
    fn mode(&self) -> ResponseMode;
}
