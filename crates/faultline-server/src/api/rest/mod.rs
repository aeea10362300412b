//! REST API implementation
//!
//! - types: state and transport-only payloads
//! - extractors: JSON and query extractors answering with envelopes
//! - handlers: one handler per governance operation
//! - router: route table and layers

mod extractors;
mod handlers;
mod router;
pub mod types;

pub use extractors::{JsonExtractor, QueryExtractor};
pub use router::create_router;
pub use types::{AppState, HealthResponse};
