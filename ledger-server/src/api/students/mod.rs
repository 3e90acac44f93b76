//! Student API Module
//!
//! Cross-admission financial roll-ups for one student.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

/// Student router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/students", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/{id}/summary", get(handler::get_summary))
}
