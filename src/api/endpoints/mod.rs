//! API endpoint handlers.
//!
//! Handlers only translate between HTTP and the pipeline. Anything that
//! blocks (model round-trip, audit file I/O) runs on the blocking pool.

pub mod analyze;
pub mod audit;
pub mod health;
