//! HTTP API module exposing quotes, resolution and pricing as JSON.
//!
//! This module handles:
//! - Shared application state over the upstream clients
//! - Request handlers and JSON error mapping
//! - Route table with CORS and request tracing

pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, AppState};
pub use routes::{create_router, health_router};
