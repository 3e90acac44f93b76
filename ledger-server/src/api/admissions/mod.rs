//! Admission API Module
//!
//! All mutations go through the LedgerManager command pipeline; the
//! handlers only translate HTTP to commands and attach the optimistic
//! concurrency token.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Admission router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admissions", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Register a new admission
        .route("/", post(handler::register))
        // Current snapshot
        .route("/{id}", get(handler::get_snapshot))
        // Roll-up with OVERDUE derived at read time
        .route("/{id}/summary", get(handler::get_summary))
        // Payment audit trail
        .route("/{id}/history", get(handler::get_history))
        // Record a payment against one installment
        .route(
            "/{id}/installments/{number}/payments",
            post(handler::record_payment),
        )
        // Approve or reject a pending cheque
        .route(
            "/{id}/installments/{number}/clearance",
            post(handler::resolve_clearance),
        )
}
