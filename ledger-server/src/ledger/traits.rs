//! Core traits and types for the ledger command pipeline
//!
//! Defines the `CommandHandler` trait implemented by every action, the
//! `EventApplier` trait implemented by every applier, and the
//! `CommandContext` that actions use to read snapshots and allocate
//! event sequence numbers inside the active write transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;

use super::appliers::{
    AdmissionRegisteredApplier, ChequeBouncedApplier, ChequeClearedApplier, ChequeRecordedApplier,
    EventAction, PaymentRecordedApplier,
};
use super::storage::LedgerStorage;
use shared::ledger::{AdmissionSnapshot, LedgerEvent};
use thiserror::Error;

/// Validation and execution errors produced by command handlers
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Admission not found: {0}")]
    AdmissionNotFound(String),

    #[error("Admission already exists: {0}")]
    AdmissionAlreadyExists(String),

    #[error("Installment {1} not found on admission {0}")]
    InstallmentNotFound(String, u32),

    #[error("Installment {0} is already fully paid")]
    AlreadySettled(u32),

    #[error("Installment {0} has a cheque awaiting clearance")]
    ClearancePending(u32),

    #[error("Installment {0} has no cheque awaiting clearance")]
    NoClearancePending(u32),

    #[error("Tendered amount {tendered:.2} exceeds outstanding {outstanding:.2}")]
    OverpaymentNotAllowed { tendered: f64, outstanding: f64 },

    #[error("Cheque payments require cheque number, cheque date and bank name")]
    MissingChequeDetails,

    #[error("No unsettled later installment can absorb the shortfall from installment {0}")]
    NoCarryForwardTarget(u32),

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Invalid fee structure: {0}")]
    InvalidFeeStructure(String),

    #[error("Schedule mismatch: {0}")]
    ScheduleMismatch(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Command metadata passed to handlers
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    pub timestamp: i64,
}

/// Execution context shared by command handlers and the manager.
///
/// Wraps the active write transaction, caches snapshots modified while
/// applying events, and hands out event sequence numbers. Snapshots are
/// only persisted by the manager after the handler succeeded, so a failed
/// command never leaves partial state behind.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a LedgerStorage,
    current_sequence: u64,
    modified: HashMap<String, AdmissionSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        txn: &'a WriteTransaction,
        storage: &'a LedgerStorage,
        current_sequence: u64,
    ) -> Self {
        Self {
            txn,
            storage,
            current_sequence,
            modified: HashMap::new(),
        }
    }

    /// Load a snapshot, preferring the in-context modified copy.
    ///
    /// Reads through the write transaction so handlers observe their own
    /// uncommitted state.
    pub fn load_snapshot(&self, admission_id: &str) -> Result<AdmissionSnapshot, LedgerError> {
        if let Some(snapshot) = self.modified.get(admission_id) {
            return Ok(snapshot.clone());
        }

        match self.storage.get_snapshot_txn(self.txn, admission_id) {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(LedgerError::AdmissionNotFound(admission_id.to_string())),
            Err(e) => Err(LedgerError::Storage(e.to_string())),
        }
    }

    /// Create a fresh snapshot shell for a new admission
    pub fn create_snapshot(&self, admission_id: String) -> AdmissionSnapshot {
        AdmissionSnapshot::new(admission_id)
    }

    /// Stage a modified snapshot. The manager persists staged snapshots
    /// after all events applied.
    pub fn save_snapshot(&mut self, snapshot: AdmissionSnapshot) {
        self.modified.insert(snapshot.admission_id.clone(), snapshot);
    }

    /// Allocate the next event sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.current_sequence += 1;
        self.current_sequence
    }

    /// Snapshots modified during this command
    pub fn modified_snapshots(&self) -> impl Iterator<Item = &AdmissionSnapshot> {
        self.modified.values()
    }
}

/// Command handler: validates a command against current state and emits events
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError>;
}

/// Event applier: mutates a snapshot according to one event.
///
/// Appliers are PURE state transitions. They never validate and never
/// fail; all checks happened in the command handler that emitted the
/// event. Replaying the event log through appliers must always rebuild
/// the same snapshot.
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut AdmissionSnapshot, event: &LedgerEvent);
}
