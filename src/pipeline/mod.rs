pub mod decision; // Model call + response normalization
pub mod gate; // Confidence gate (human-review override)
pub mod orchestrator; // Redact → decide → parse → gate → audit
pub mod redact;

pub use gate::{ConfidenceGate, InvalidThreshold, DEFAULT_REVIEW_THRESHOLD};
pub use orchestrator::{DecisionPipeline, PipelineError};
