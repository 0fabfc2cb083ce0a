//! Shared types for the API layer.

use std::sync::Arc;

use crate::pipeline::DecisionPipeline;

/// Shared context for all routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<DecisionPipeline>,
    /// Allowed CORS origins; empty means any.
    pub cors_origins: Arc<Vec<String>>,
}

impl ApiContext {
    pub fn new(pipeline: Arc<DecisionPipeline>) -> Self {
        Self {
            pipeline,
            cors_origins: Arc::new(Vec::new()),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::new(origins);
        self
    }
}
