use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{FinalDecision, ReviewStatus};

/// Version tag written into every audit entry.
pub const SCHEMA_VERSION: &str = "v1.0";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// One immutable record of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub case_id: Uuid,
    /// Generation time, RFC 3339.
    pub timestamp: DateTime<Utc>,
    /// The bundle exactly as received, before redaction.
    pub input_snapshot: serde_json::Map<String, serde_json::Value>,
    pub decision: FinalDecision,
    pub reasoning: String,
    pub confidence: f64,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub status: ReviewStatus,
}

impl AuditEntry {
    /// Build an entry. `status` is derived from `decision` and `confidence`
    /// is clamped into [0, 1].
    pub fn new(
        case_id: Uuid,
        timestamp: DateTime<Utc>,
        input_snapshot: serde_json::Map<String, serde_json::Value>,
        decision: FinalDecision,
        reasoning: String,
        confidence: f64,
    ) -> Self {
        Self {
            case_id,
            timestamp,
            input_snapshot,
            decision,
            reasoning,
            confidence: clamp_confidence(confidence),
            schema_version: default_schema_version(),
            status: decision.status(),
        }
    }
}

/// Clamp into [0, 1]. NaN becomes 0.0 so it can never pass a threshold.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
