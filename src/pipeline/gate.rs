//! Confidence gate: the deterministic safety override between the model
//! and the audit trail.
//!
//! Below the threshold the model's decision is discarded and the case goes
//! to a human reviewer, whatever the model said. At or above it, APPROVED
//! and DENIED pass through and NEEDS_INFO is finalised as DENIED, since
//! nothing is approved without an explicit approval.

use crate::models::{clamp_confidence, FinalDecision, ModelDecision, ReviewStatus};

/// Default confidence below which a case is routed to human review.
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.80;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Review threshold must lie in [0, 1], got {0}")]
pub struct InvalidThreshold(pub f64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl ConfidenceGate {
    pub fn new(threshold: f64) -> Result<Self, InvalidThreshold> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Finalise a model decision. The returned status is always the one
    /// implied by the returned decision.
    pub fn finalize(&self, decision: ModelDecision, confidence: f64) -> (FinalDecision, ReviewStatus) {
        let final_decision = if clamp_confidence(confidence) < self.threshold {
            FinalDecision::PendingReview
        } else {
            match decision {
                ModelDecision::Approved => FinalDecision::Approved,
                ModelDecision::Denied | ModelDecision::NeedsInfo => FinalDecision::Denied,
            }
        };
        (final_decision, final_decision.status())
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_REVIEW_THRESHOLD,
        }
    }
}
