pub mod audit_entry;
pub mod enums;
pub mod request;

pub use audit_entry::{clamp_confidence, AuditEntry, SCHEMA_VERSION};
pub use enums::{FinalDecision, InvalidEnumValue, ModelDecision, ReviewStatus};
pub use request::AnalysisRequest;
