//! Shared types for the admission ledger
//!
//! Common types used across crates: ledger domain types (commands, events,
//! snapshots, summaries), error types, response structures, and utilities.

pub mod error;
pub mod ledger;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
