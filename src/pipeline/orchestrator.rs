//! Decision pipeline orchestrator.
//!
//! Single entry point that drives one authorization case end to end:
//! serialize → redact → model call → parse → confidence gate → audit.
//!
//! Every collaborator is injected (`DecisionClient`, `AuditStore`), so the
//! pipeline is fully testable with mock implementations. Stages run in a
//! fixed order and the first failure aborts the run. Nothing is written to
//! the audit trail unless every earlier stage succeeded, and a run is only
//! reported as successful once its entry is durably recorded.
//!
//! Logging never carries bundle content, the policy, the redacted text or
//! the model's answer: only the case id, a digest, counts and outcomes.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::audit::{AuditError, AuditStore};
use crate::models::{AnalysisRequest, AuditEntry};
use crate::pipeline::decision::{parse_for_mode, DecisionClient, DecisionError};
use crate::pipeline::gate::ConfidenceGate;
use crate::pipeline::redact::redact_counted;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that abort a pipeline run. No audit entry exists for any of them.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Bundle could not be serialized: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("{0}")]
    Model(#[source] DecisionError),

    #[error("{0}")]
    Parse(#[source] DecisionError),

    #[error("Audit log write failed: {0}")]
    Persist(#[source] AuditError),

    #[error("Pipeline task aborted: {0}")]
    Aborted(String),
}

impl PipelineError {
    /// Short label for logs. The display text can carry a provider body,
    /// which may echo model output, so only this goes into tracing.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Serialize(_) => "serialize",
            Self::Model(e) | Self::Parse(e) => e.kind(),
            Self::Persist(e) => e.kind(),
            Self::Aborted(_) => "aborted",
        }
    }

    /// Provider HTTP status behind a model failure, if any.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            Self::Model(e) | Self::Parse(e) => e.status(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct DecisionPipeline {
    client: Arc<dyn DecisionClient>,
    store: Arc<dyn AuditStore>,
    gate: ConfidenceGate,
}

impl DecisionPipeline {
    pub fn new(
        client: Arc<dyn DecisionClient>,
        store: Arc<dyn AuditStore>,
        gate: ConfidenceGate,
    ) -> Self {
        Self {
            client,
            store,
            gate,
        }
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    pub fn gate(&self) -> &ConfidenceGate {
        &self.gate
    }

    /// All recorded entries, in append order.
    pub fn list_entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        self.store.list()
    }

    /// Run one case through every stage and return the recorded entry.
    ///
    /// Blocking: performs the model round-trip and the audit write on the
    /// calling thread.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AuditEntry, PipelineError> {
        let case_id = Uuid::new_v4();
        let span = tracing::info_span!("analyze", %case_id);
        let _enter = span.enter();
        let started = Instant::now();

        // Stage 1: serialize the bundle exactly once.
        let serialized = request
            .serialized_bundle()
            .map_err(PipelineError::Serialize)?;
        let digest = format!("{:x}", Sha256::digest(serialized.as_bytes()));

        // Stage 2: minimize identifiers in the model-facing copy only.
        let (redacted, substitutions) = redact_counted(&serialized);
        tracing::info!(
            bundle_sha256 = %digest,
            bundle_bytes = serialized.len(),
            substitutions,
            "Case received"
        );

        // Stage 3: one model round-trip, no retry.
        let call_started = Instant::now();
        let raw = self
            .client
            .invoke(&request.policy, &redacted)
            .map_err(|e| {
                tracing::error!(kind = e.kind(), status = ?e.status(), "Model call failed");
                PipelineError::Model(e)
            })?;
        tracing::debug!(
            model = self.client.model_id(),
            elapsed_ms = call_started.elapsed().as_millis() as u64,
            shape = raw.shape().as_str(),
            "Model answered"
        );

        // Stage 4: normalize whichever shape came back.
        let parsed = parse_for_mode(&raw, self.client.mode()).map_err(|e| {
            tracing::error!(kind = e.kind(), "Model answer unusable");
            PipelineError::Parse(e)
        })?;
        let triple = parsed.triple;

        // Stage 5: deterministic override below the threshold.
        let (decision, status) = self.gate.finalize(triple.decision, triple.confidence);

        // Stage 6: the entry keeps the original, unredacted bundle.
        let entry = AuditEntry::new(
            case_id,
            Utc::now(),
            request.fhir_bundle.clone(),
            decision,
            triple.reason,
            triple.confidence,
        );
        self.store.append(&entry).map_err(|e| {
            tracing::error!(kind = e.kind(), "Audit write failed");
            PipelineError::Persist(e)
        })?;

        tracing::info!(
            model_decision = triple.decision.as_str(),
            decision = decision.as_str(),
            status = status.as_str(),
            confidence = entry.confidence,
            threshold = self.gate.threshold(),
            fallbacks = parsed.fallbacks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Case decided"
        );

        Ok(entry)
    }
}
