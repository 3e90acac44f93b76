//! LedgerManager - Core command processing and event generation
//!
//! This module handles:
//! - Command validation and processing
//! - Event generation with global sequence numbers
//! - Persistence to redb (transactional)
//! - Snapshot updates and optimistic version checks
//! - Event broadcasting (for the receipt collaborator and read models)
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Pre-generate admission id/number (RegisterAdmission only)
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Optimistic version check (expected_version)
//!     ├─ 5. Convert command to action and execute
//!     ├─ 6. Apply events to snapshots via EventApplier
//!     ├─ 7. Persist events, snapshots and student index
//!     ├─ 8. Mark command processed, commit transaction
//!     ├─ 9. Broadcast event(s)
//!     └─ 10. Return response
//! ```

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::appliers::EventAction;
use super::storage::{LedgerStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use shared::ledger::{
    AdmissionSnapshot, AdmissionSummary, CommandResponse, EventPayload, LedgerCommand,
    LedgerCommandPayload, LedgerEvent, PaymentHistoryEntry, StudentFinancialSummary,
};
use std::path::Path;
use tokio::sync::broadcast;

/// Event broadcast channel capacity (one campus fee counter stays far below
/// this; the headroom covers bulk registration imports)
const EVENT_CHANNEL_CAPACITY: usize = 8192;

/// LedgerManager for command processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect server restarts and re-read their snapshots.
pub struct LedgerManager {
    storage: LedgerStorage,
    event_tx: broadcast::Sender<LedgerEvent>,
    /// Server instance epoch - unique ID generated on startup
    epoch: String,
    /// Institute timezone for due-date derivation
    tz: Tz,
}

impl std::fmt::Debug for LedgerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerManager")
            .field("storage", &"<LedgerStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl LedgerManager {
    /// Create a new LedgerManager with the given database path
    pub fn new(db_path: impl AsRef<Path>, tz: Tz) -> ManagerResult<Self> {
        let storage = LedgerStorage::open(db_path)?;
        Ok(Self::with_storage(storage, tz))
    }

    /// Create a LedgerManager with existing storage (tests use the in-memory
    /// backend through this)
    pub fn with_storage(storage: LedgerStorage, tz: Tz) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "LedgerManager started with new epoch");
        Self {
            storage,
            event_tx,
            epoch,
            tz,
        }
    }

    /// Get the server epoch (unique instance ID)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Institute-local calendar date, used for OVERDUE derivation
    pub fn business_today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.event_tx.subscribe()
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &LedgerStorage {
        &self.storage
    }

    /// Generate next admission number (crash-safe via redb)
    fn next_admission_number(&self) -> String {
        let count = self.storage.next_admission_count().unwrap_or(1);
        let date_str = Utc::now()
            .with_timezone(&self.tz)
            .format("%Y%m%d")
            .to_string();
        format!("ADM{}{}", date_str, 10000 + count)
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: LedgerCommand) -> CommandResponse {
        self.execute_command_with_events(cmd).0
    }

    /// Execute a command and return both the response and generated events
    ///
    /// The API layer uses the returned events to hand the receipt
    /// collaborator its (snapshot, history entry) pair without a second
    /// read, while the events are still broadcast internally.
    pub fn execute_command_with_events(
        &self,
        cmd: LedgerCommand,
    ) -> (CommandResponse, Vec<LedgerEvent>) {
        match self.process_command(cmd.clone()) {
            Ok((response, events)) => {
                // Broadcast events after successful commit
                for event in &events {
                    if self.event_tx.send(event.clone()).is_err() {
                        tracing::warn!("Event broadcast failed: no active receivers");
                        break;
                    }
                }
                (response, events)
            }
            Err(err) => (CommandResponse::error(cmd.command_id, err.into()), vec![]),
        }
    }

    /// Process command and return response with events
    ///
    /// Uses the action-based architecture:
    /// 1. Convert command to CommandAction
    /// 2. Execute action to generate events
    /// 3. Apply events to snapshots via EventApplier
    /// 4. Persist everything atomically
    fn process_command(
        &self,
        cmd: LedgerCommand,
    ) -> ManagerResult<(CommandResponse, Vec<LedgerEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 2. Pre-generate admission id and number for RegisterAdmission
        // (BEFORE the transaction; redb doesn't allow nested write
        // transactions and the counter uses its own)
        let pre_generated = match &cmd.payload {
            LedgerCommandPayload::RegisterAdmission { .. } => {
                let admission_id = uuid::Uuid::new_v4().to_string();
                let admission_number = self.next_admission_number();
                tracing::debug!(
                    admission_id = %admission_id,
                    admission_number = %admission_number,
                    "Pre-generated admission identity"
                );
                Some((admission_id, admission_number))
            }
            _ => None,
        };

        // 3. Begin write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within transaction
        if self
            .storage
            .is_command_processed_txn(&txn, &cmd.command_id)?
        {
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 4. Optimistic version check against the stored snapshot
        if let (Some(expected), Some(admission_id)) =
            (cmd.expected_version, cmd.payload.admission_id())
        {
            let actual = self
                .storage
                .get_snapshot_txn(&txn, admission_id)?
                .ok_or_else(|| ManagerError::AdmissionNotFound(admission_id.to_string()))?
                .version;
            if actual != expected {
                tracing::warn!(
                    command_id = %cmd.command_id,
                    admission_id = %admission_id,
                    expected,
                    actual,
                    "Stale command rejected"
                );
                return Err(ManagerError::ConcurrentModification {
                    admission_id: admission_id.to_string(),
                    expected,
                    actual,
                });
            }
        }

        // 5. Get current sequence for context initialization
        let current_sequence = self.storage.get_current_sequence()?;

        // 6. Create context and metadata
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: cmd.timestamp,
        };

        // 7. Convert to action and execute
        // RegisterAdmission carries the pre-generated identity
        let action: CommandAction = match &cmd.payload {
            LedgerCommandPayload::RegisterAdmission { admission } => {
                let (admission_id, admission_number) = pre_generated.ok_or_else(|| {
                    ManagerError::Internal(
                        "admission identity must be pre-generated for RegisterAdmission"
                            .to_string(),
                    )
                })?;
                CommandAction::RegisterAdmission(super::actions::RegisterAdmissionAction {
                    admission: admission.clone(),
                    admission_id,
                    admission_number,
                })
            }
            _ => (&cmd).into(),
        };
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))
            .map_err(ManagerError::from)?;

        // 8. Apply events to snapshots
        for event in &events {
            let mut snapshot = ctx
                .load_snapshot(&event.admission_id)
                .unwrap_or_else(|_| AdmissionSnapshot::new(event.admission_id.clone()));

            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);

            ctx.save_snapshot(snapshot);
        }

        // 9. Persist events, and index newly registered admissions by student
        for event in &events {
            self.storage.store_event(&txn, event)?;
            if let EventPayload::AdmissionRegistered { student_id, .. } = &event.payload {
                self.storage
                    .link_student_admission(&txn, student_id, &event.admission_id)?;
            }
        }

        // 10. Persist snapshots
        for snapshot in ctx.modified_snapshots() {
            self.storage.store_snapshot(&txn, snapshot)?;
        }

        // 11. Update sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 12. Mark command processed
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;

        // 13. Commit transaction
        txn.commit().map_err(StorageError::from)?;

        let admission_id = events.first().map(|e| e.admission_id.clone());
        tracing::info!(
            command_id = %cmd.command_id,
            admission_id = ?admission_id,
            event_count = events.len(),
            "Command processed successfully"
        );
        Ok((CommandResponse::success(cmd.command_id, admission_id), events))
    }

    // ========== Public Query Methods ==========

    /// Get a snapshot by admission ID
    pub fn get_snapshot(&self, admission_id: &str) -> ManagerResult<Option<AdmissionSnapshot>> {
        Ok(self.storage.get_snapshot(admission_id)?)
    }

    /// Admission-level roll-up with OVERDUE derived against the institute
    /// calendar
    pub fn get_admission_summary(
        &self,
        admission_id: &str,
    ) -> ManagerResult<Option<AdmissionSummary>> {
        self.get_admission_summary_at(admission_id, self.business_today())
    }

    /// Admission summary against an explicit date (deterministic reads)
    pub fn get_admission_summary_at(
        &self,
        admission_id: &str,
        today: NaiveDate,
    ) -> ManagerResult<Option<AdmissionSummary>> {
        Ok(self
            .storage
            .get_snapshot(admission_id)?
            .map(|snapshot| AdmissionSummary::from_snapshot(&snapshot, today)))
    }

    /// Totals across every admission of one student
    pub fn get_student_summary(
        &self,
        student_id: &str,
    ) -> ManagerResult<StudentFinancialSummary> {
        self.get_student_summary_at(student_id, self.business_today())
    }

    /// Student summary against an explicit date
    pub fn get_student_summary_at(
        &self,
        student_id: &str,
        today: NaiveDate,
    ) -> ManagerResult<StudentFinancialSummary> {
        let snapshots = self.storage.get_snapshots_for_student(student_id)?;
        Ok(StudentFinancialSummary::from_snapshots(
            student_id.to_string(),
            &snapshots,
            today,
        ))
    }

    /// Payment audit trail for one admission, projected from its events in
    /// sequence order
    pub fn get_payment_history(
        &self,
        admission_id: &str,
    ) -> ManagerResult<Vec<PaymentHistoryEntry>> {
        let events = self.storage.get_events_for_admission(admission_id)?;
        if events.is_empty() {
            return Err(ManagerError::AdmissionNotFound(admission_id.to_string()));
        }
        Ok(events
            .iter()
            .filter_map(PaymentHistoryEntry::from_event)
            .collect())
    }

    /// Get current sequence number
    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Get events since a given sequence
    pub fn get_events_since(&self, since_sequence: u64) -> ManagerResult<Vec<LedgerEvent>> {
        Ok(self.storage.get_events_since(since_sequence)?)
    }

    /// Get all events for a specific admission
    pub fn get_events_for_admission(
        &self,
        admission_id: &str,
    ) -> ManagerResult<Vec<LedgerEvent>> {
        Ok(self.storage.get_events_for_admission(admission_id)?)
    }

    /// Rebuild a snapshot from events (for verification)
    ///
    /// Uses EventApplier to apply each event to build the snapshot.
    pub fn rebuild_snapshot(&self, admission_id: &str) -> ManagerResult<AdmissionSnapshot> {
        let events = self.storage.get_events_for_admission(admission_id)?;
        if events.is_empty() {
            return Err(ManagerError::AdmissionNotFound(admission_id.to_string()));
        }

        let mut snapshot = AdmissionSnapshot::new(admission_id.to_string());
        for event in &events {
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
        }

        Ok(snapshot)
    }

    /// Replay the event log and compare against the stored snapshot
    ///
    /// Returns true when the stored and rebuilt checksums agree.
    pub fn verify_snapshot(&self, admission_id: &str) -> ManagerResult<bool> {
        let stored = self
            .storage
            .get_snapshot(admission_id)?
            .ok_or_else(|| ManagerError::AdmissionNotFound(admission_id.to_string()))?;
        let rebuilt = self.rebuild_snapshot(admission_id)?;
        if stored.state_checksum != rebuilt.state_checksum {
            tracing::error!(
                admission_id = %admission_id,
                stored = %stored.state_checksum,
                rebuilt = %rebuilt.state_checksum,
                "Snapshot drift detected between event log and stored snapshot"
            );
            return Ok(false);
        }
        Ok(true)
    }
}

// Make LedgerManager Clone-able (storage is Arc-backed)
impl Clone for LedgerManager {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            event_tx: self.event_tx.clone(),
            epoch: self.epoch.clone(),
            tz: self.tz,
        }
    }
}
