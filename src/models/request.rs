use serde::{Deserialize, Serialize};

/// Inbound request for one authorization decision.
///
/// The bundle is opaque to the service; it only has to be a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub fhir_bundle: serde_json::Map<String, serde_json::Value>,
    pub policy: String,
}

impl AnalysisRequest {
    pub fn new(fhir_bundle: serde_json::Map<String, serde_json::Value>, policy: &str) -> Self {
        Self {
            fhir_bundle,
            policy: policy.to_string(),
        }
    }

    /// Compact JSON text of the bundle, as handed to the redactor.
    pub fn serialized_bundle(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.fhir_bundle)
    }
}
