//! HTTP surface of the decision service.
//!
//! `api_router()` returns a composable `Router` that can be mounted on any
//! axum server. Handlers stay thin: they hand the request to the shared
//! `DecisionPipeline` and map its outcome onto a response.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
