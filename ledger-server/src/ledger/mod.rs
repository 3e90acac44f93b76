//! Ledger domain - event-sourced installment payment processing
//!
//! # Architecture
//!
//! ```text
//! LedgerCommand ──> CommandAction (validate) ──> LedgerEvent(s)
//!                                                     │
//!                       EventAction (apply) <─────────┤
//!                              │                      │
//!                      AdmissionSnapshot         event stream
//!                       (redb snapshots)         (redb events)
//! ```
//!
//! Commands are validated against current state and turned into events;
//! events are the only thing that mutates snapshots, so replaying the
//! stream always rebuilds the same state.

pub mod actions;
pub mod appliers;
pub mod manager;
pub mod money;
pub mod storage;
pub mod traits;

pub use manager::{LedgerManager, ManagerError, ManagerResult};
pub use storage::{LedgerStorage, StorageError, StorageStats};
pub use traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier, LedgerError};

// Re-export shared ledger types for convenience
pub use shared::ledger::{
    AdmissionInput, AdmissionSnapshot, AdmissionSummary, CommandResponse, LedgerCommand,
    LedgerCommandPayload, LedgerEvent, PaymentHistoryEntry, PaymentInput,
    StudentFinancialSummary,
};
