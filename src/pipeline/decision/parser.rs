//! Normalizes either model response shape into a `DecisionTriple`.
//!
//! Ambiguity is resolved with conservative defaults instead of failing the
//! request. Every default that fires is recorded as a `ParseFallback` and
//! logged, so a lossy parse is always distinguishable from a clean one.
//! Only an empty or unreadable response is an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::types::{DecisionTriple, RawModelResponse, ResponseMode};
use super::DecisionError;
use crate::models::{clamp_confidence, ModelDecision};

/// Used when no explicit approval can be read. Approval is never inferred.
pub const DEFAULT_DECISION: ModelDecision = ModelDecision::Denied;

/// Used when no confidence can be read. Sits above the default review
/// threshold, so an unreadable confidence alone does not trigger review;
/// watch for `ConfidenceDefaulted` instead.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

static DECISION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)DECISION\s*\**\s*:\s*\**\s*\[?\s*(APPROVED|DENIED|NEEDS[_ \-]INFO)").unwrap()
});

static CONFIDENCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)CONFIDENCE\s*\**\s*:\s*\**\s*\[?\s*([\d.]+)").unwrap()
});

static REASON_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)REASON\s*\**\s*:\s*\**\s*(.+)$").unwrap()
});

/// A default or correction applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFallback {
    /// No recognizable decision; `DEFAULT_DECISION` used.
    DecisionDefaulted,
    /// No readable confidence; `DEFAULT_CONFIDENCE` used.
    ConfidenceDefaulted,
    /// Confidence was outside [0, 1] and has been clamped.
    ConfidenceClamped,
    /// No reason field/marker; the best available text was used.
    ReasonMissing,
    /// A structured call was requested but free text came back.
    StructuredShapeMismatch,
}

impl ParseFallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecisionDefaulted => "decision_defaulted",
            Self::ConfidenceDefaulted => "confidence_defaulted",
            Self::ConfidenceClamped => "confidence_clamped",
            Self::ReasonMissing => "reason_missing",
            Self::StructuredShapeMismatch => "structured_shape_mismatch",
        }
    }
}

/// Parser output: the triple plus every fallback that fired.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDecision {
    pub triple: DecisionTriple,
    pub fallbacks: Vec<ParseFallback>,
}

impl ParsedDecision {
    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }

    pub fn used(&self, fallback: ParseFallback) -> bool {
        self.fallbacks.contains(&fallback)
    }
}

/// Parse a raw response according to its own shape.
pub fn parse(raw: &RawModelResponse) -> Result<ParsedDecision, DecisionError> {
    let parsed = match raw {
        RawModelResponse::Structured { arguments } => parse_structured(arguments)?,
        RawModelResponse::FreeText { content } => parse_free_text(content)?,
    };
    log_fallbacks(&parsed);
    Ok(parsed)
}

/// Parse, additionally flagging a response whose shape differs from the one
/// the client asked for.
pub fn parse_for_mode(
    raw: &RawModelResponse,
    requested: ResponseMode,
) -> Result<ParsedDecision, DecisionError> {
    let mut parsed = parse(raw)?;
    if requested == ResponseMode::Structured && raw.shape() == ResponseMode::FreeText {
        tracing::warn!(
            fallback = ParseFallback::StructuredShapeMismatch.as_str(),
            "structured output requested but model answered in free text"
        );
        parsed.fallbacks.push(ParseFallback::StructuredShapeMismatch);
    }
    Ok(parsed)
}

fn log_fallbacks(parsed: &ParsedDecision) {
    for fallback in &parsed.fallbacks {
        tracing::warn!(fallback = fallback.as_str(), "model response parsed with fallback");
    }
}

// ── Structured (tool-call arguments) ───────────────────────

fn parse_structured(arguments: &str) -> Result<ParsedDecision, DecisionError> {
    if arguments.trim().is_empty() {
        return Err(DecisionError::EmptyResponse);
    }
    let object = arguments_object(arguments)?;
    let mut fallbacks = Vec::new();

    let decision = match object
        .get("decision")
        .and_then(Value::as_str)
        .and_then(ModelDecision::from_model_text)
    {
        Some(d) => d,
        None => {
            fallbacks.push(ParseFallback::DecisionDefaulted);
            DEFAULT_DECISION
        }
    };

    let confidence = match object.get("confidence").and_then(confidence_value) {
        Some(c) => checked_confidence(c, &mut fallbacks),
        None => {
            fallbacks.push(ParseFallback::ConfidenceDefaulted);
            DEFAULT_CONFIDENCE
        }
    };

    let reason = match object
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
    {
        Some(r) => r.to_string(),
        None => {
            fallbacks.push(ParseFallback::ReasonMissing);
            String::new()
        }
    };

    Ok(ParsedDecision {
        triple: DecisionTriple {
            decision,
            reason,
            confidence,
        },
        fallbacks,
    })
}

/// Tool arguments as a JSON object. Some providers double-encode the
/// arguments as a JSON string; that is unwrapped once.
fn arguments_object(arguments: &str) -> Result<Map<String, Value>, DecisionError> {
    let value: Value = serde_json::from_str(arguments)
        .map_err(|e| DecisionError::GarbledResponse(format!("tool arguments are not JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::String(inner) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(DecisionError::GarbledResponse(
                "tool arguments are not a JSON object".into(),
            )),
        },
        _ => Err(DecisionError::GarbledResponse(
            "tool arguments are not a JSON object".into(),
        )),
    }
}

/// Numeric confidence, also accepting a numeric string.
fn confidence_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|c| c.is_finite())
}

fn checked_confidence(value: f64, fallbacks: &mut Vec<ParseFallback>) -> f64 {
    let clamped = clamp_confidence(value);
    if clamped != value {
        fallbacks.push(ParseFallback::ConfidenceClamped);
    }
    clamped
}

// ── Free text (DECISION / CONFIDENCE / REASON markers) ─────

fn parse_free_text(content: &str) -> Result<ParsedDecision, DecisionError> {
    let text = content.trim();
    if text.is_empty() {
        return Err(DecisionError::EmptyResponse);
    }
    let mut fallbacks = Vec::new();

    let decision = match DECISION_MARKER
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| ModelDecision::from_model_text(m.as_str()))
    {
        Some(d) => d,
        None => {
            fallbacks.push(ParseFallback::DecisionDefaulted);
            DEFAULT_DECISION
        }
    };

    let confidence = match CONFIDENCE_MARKER
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|c| c.is_finite())
    {
        Some(c) => checked_confidence(c, &mut fallbacks),
        None => {
            fallbacks.push(ParseFallback::ConfidenceDefaulted);
            DEFAULT_CONFIDENCE
        }
    };

    let reason = match REASON_MARKER
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|r| !r.is_empty())
    {
        Some(r) => r.to_string(),
        None => {
            fallbacks.push(ParseFallback::ReasonMissing);
            text.to_string()
        }
    };

    Ok(ParsedDecision {
        triple: DecisionTriple {
            decision,
            reason,
            confidence,
        },
        fallbacks,
    })
}
