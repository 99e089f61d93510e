//! Microrag HTTP Server
//!
//! JSON API over the answer pipeline.

mod schema;
mod server;

pub use schema::{ApiError, AskRequest, HealthResponse, MetricsResponse, MAX_QUESTION_CHARS, MAX_TOP_K};
pub use server::{router, start_server, AppState};
