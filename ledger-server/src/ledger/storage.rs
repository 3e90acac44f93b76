//! redb-based storage layer for ledger event sourcing
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(admission_id, sequence)` | `LedgerEvent` | Event stream (append-only) |
//! | `snapshots` | `admission_id` | `AdmissionSnapshot` | Snapshot cache |
//! | `student_admissions` | `(student_id, admission_id)` | `()` | Student admission index |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `sequence_counter` | `"seq"` / `"admission_count"` | `u64` | Global counters |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`, so a payment acknowledged to
//! the fee counter is on disk before the response leaves the server. This is
//! critical for on-premise installs that may lose power without warning.
//!
//! # Snapshot Frequency
//!
//! Snapshots are persisted after every event by default. For high-throughput
//! scenarios, consider batching snapshot updates (every N events) to reduce
//! disk writes while maintaining reasonable recovery time.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::ledger::{AdmissionSnapshot, LedgerEvent};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing events: key = (admission_id, sequence), value = JSON-serialized LedgerEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Table for storing snapshots: key = admission_id, value = JSON-serialized AdmissionSnapshot
const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Table indexing admissions per student: key = (student_id, admission_id), value = empty
const STUDENT_ADMISSIONS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("student_admissions");

/// Table for tracking processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Table for counters: key = "seq" or "admission_count", value = u64
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const SEQUENCE_KEY: &str = "seq";
const ADMISSION_COUNT_KEY: &str = "admission_count";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Admission not found: {0}")]
    AdmissionNotFound(String),

    #[error("Event not found: admission_id={0}, sequence={1}")]
    EventNotFound(String, u64),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Ledger storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
}

impl LedgerStorage {
    /// Open or create the database at the given path
    ///
    /// # Durability Guarantees
    ///
    /// redb uses `Durability::Immediate` by default, which ensures:
    /// - Commits are persistent as soon as `commit()` returns
    /// - Uses copy-on-write with atomic pointer swap (safe against power loss)
    /// - Database file always in consistent state
    ///
    /// A recorded payment must survive any crash that happens after the
    /// operator saw the success response.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(STUDENT_ADMISSIONS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            // Initialize sequence counter if not exists
            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(STUDENT_ADMISSIONS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            seq_table.insert(SEQUENCE_KEY, 0u64)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Get the next sequence number (does NOT increment - use within transaction)
    pub fn get_next_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        Ok(current + 1)
    }

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number (within transaction)
    ///
    /// Used by the manager to advance the sequence after events are generated.
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    // ========== Admission Counter (for admission number) ==========

    /// Get and increment admission count atomically
    /// Returns the NEW count after increment
    pub fn next_admission_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(ADMISSION_COUNT_KEY)?
            .map(|g| g.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(ADMISSION_COUNT_KEY, next)?;
        drop(table);
        txn.commit()?;
        Ok(next)
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &LedgerEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let key = (event.admission_id.as_str(), event.sequence);
        let value = serde_json::to_vec(event)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get all events for an admission, ordered by sequence
    pub fn get_events_for_admission(&self, admission_id: &str) -> StorageResult<Vec<LedgerEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        let range_start = (admission_id, 0u64);
        let range_end = (admission_id, u64::MAX);

        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let event: LedgerEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    /// Get events since a given sequence (across all admissions)
    pub fn get_events_since(&self, since_sequence: u64) -> StorageResult<Vec<LedgerEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let event: LedgerEvent = serde_json::from_slice(value.value())?;
            if event.sequence > since_sequence {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    // ========== Snapshot Operations ==========

    /// Store a snapshot
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &AdmissionSnapshot,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        let value = serde_json::to_vec(snapshot)?;
        table.insert(snapshot.admission_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a snapshot by admission ID
    pub fn get_snapshot(&self, admission_id: &str) -> StorageResult<Option<AdmissionSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(admission_id)? {
            Some(value) => {
                let snapshot: AdmissionSnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Get a snapshot by admission ID (within transaction)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        admission_id: &str,
    ) -> StorageResult<Option<AdmissionSnapshot>> {
        let table = txn.open_table(SNAPSHOTS_TABLE)?;

        match table.get(admission_id)? {
            Some(value) => {
                let snapshot: AdmissionSnapshot = serde_json::from_slice(value.value())?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Get all snapshots
    pub fn get_all_snapshots(&self) -> StorageResult<Vec<AdmissionSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut snapshots = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let snapshot: AdmissionSnapshot = serde_json::from_slice(value.value())?;
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    // ========== Student Index ==========

    /// Link an admission to its student (within transaction)
    pub fn link_student_admission(
        &self,
        txn: &WriteTransaction,
        student_id: &str,
        admission_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STUDENT_ADMISSIONS_TABLE)?;
        table.insert((student_id, admission_id), ())?;
        Ok(())
    }

    /// Get all admission IDs belonging to a student
    pub fn get_admission_ids_for_student(&self, student_id: &str) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STUDENT_ADMISSIONS_TABLE)?;

        let mut admission_ids: Vec<String> = Vec::new();
        for result in table.range((student_id, "")..)? {
            let (key, _value) = result?;
            let (sid, admission_id) = key.value();
            if sid != student_id {
                break;
            }
            admission_ids.push(admission_id.to_string());
        }

        Ok(admission_ids)
    }

    /// Get all admission snapshots belonging to a student
    pub fn get_snapshots_for_student(
        &self,
        student_id: &str,
    ) -> StorageResult<Vec<AdmissionSnapshot>> {
        let admission_ids = self.get_admission_ids_for_student(student_id)?;
        let mut snapshots = Vec::new();

        for admission_id in admission_ids {
            if let Some(snapshot) = self.get_snapshot(&admission_id)? {
                snapshots.push(snapshot);
            }
        }

        Ok(snapshots)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let events_table = read_txn.open_table(EVENTS_TABLE)?;
        let snapshots_table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        let commands_table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            event_count: events_table.len()?,
            snapshot_count: snapshots_table.len()?,
            processed_command_count: commands_table.len()?,
            current_sequence: seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
            admission_count: seq_table
                .get(ADMISSION_COUNT_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub event_count: u64,
    pub snapshot_count: u64,
    pub processed_command_count: u64,
    pub current_sequence: u64,
    pub admission_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::ledger::{
        EventPayload, InstallmentState, InstallmentStatus, LedgerEventType, PaymentMethod,
    };

    fn create_test_event(admission_id: &str, sequence: u64) -> LedgerEvent {
        LedgerEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            admission_id: admission_id.to_string(),
            timestamp: shared::util::now_millis(),
            client_timestamp: None,
            operator_id: "test_op".to_string(),
            operator_name: "Test Operator".to_string(),
            command_id: uuid::Uuid::new_v4().to_string(),
            event_type: LedgerEventType::PaymentRecorded,
            payload: EventPayload::PaymentRecorded {
                installment_number: 1,
                amount: 5000.0,
                paid_amount: 5000.0,
                payment_method: PaymentMethod::Cash,
                transaction_id: None,
                received_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                status: InstallmentStatus::Paid,
                carry: None,
                remarks: None,
            },
        }
    }

    fn create_test_snapshot(admission_id: &str) -> AdmissionSnapshot {
        let mut snapshot = AdmissionSnapshot::new(admission_id.to_string());
        snapshot.admission_number = "ADM2025011510001".to_string();
        snapshot.student_id = "stu-1".to_string();
        snapshot.student_name = "Asha Verma".to_string();
        snapshot.course = "B.Sc Physics".to_string();
        snapshot.fee_structure.base_fees = 30000.0;
        snapshot.fee_structure.total_fees = 30000.0;
        snapshot.fee_structure.down_payment = 10000.0;
        snapshot.installments = vec![
            InstallmentState::new(0, None, 10000.0),
            InstallmentState::new(1, NaiveDate::from_ymd_opt(2025, 2, 10), 10000.0),
            InstallmentState::new(2, NaiveDate::from_ymd_opt(2025, 3, 10), 10000.0),
        ];
        snapshot.update_checksum();
        snapshot
    }

    #[test]
    fn test_sequence_tracking() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        // Initial sequence should be 0
        assert_eq!(storage.get_current_sequence().unwrap(), 0);

        // Next sequence peeks without writing
        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.get_next_sequence(&txn).unwrap(), 1);
        storage.set_sequence(&txn, 4).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_current_sequence().unwrap(), 4);

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.get_next_sequence(&txn).unwrap(), 5);
        txn.commit().unwrap();
    }

    #[test]
    fn test_admission_count_increments() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        assert_eq!(storage.next_admission_count().unwrap(), 1);
        assert_eq!(storage.next_admission_count().unwrap(), 2);
        assert_eq!(storage.next_admission_count().unwrap(), 3);
    }

    #[test]
    fn test_command_idempotency() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let command_id = "cmd-123";

        // Command should not be processed initially
        assert!(!storage.is_command_processed(command_id).unwrap());

        // Mark as processed
        let txn = storage.begin_write().unwrap();
        storage.mark_command_processed(&txn, command_id).unwrap();
        txn.commit().unwrap();

        // Command should now be processed
        assert!(storage.is_command_processed(command_id).unwrap());
    }

    #[test]
    fn test_event_storage() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let admission_id = "adm-1";

        // Store events
        let event1 = create_test_event(admission_id, 1);
        let event2 = create_test_event(admission_id, 2);

        let txn = storage.begin_write().unwrap();
        storage.store_event(&txn, &event1).unwrap();
        storage.store_event(&txn, &event2).unwrap();
        txn.commit().unwrap();

        // Retrieve events
        let events = storage.get_events_for_admission(admission_id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].sequence, 2);
    }

    #[test]
    fn test_events_isolated_per_admission() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.store_event(&txn, &create_test_event("adm-1", 1)).unwrap();
        storage.store_event(&txn, &create_test_event("adm-2", 2)).unwrap();
        storage.store_event(&txn, &create_test_event("adm-1", 3)).unwrap();
        txn.commit().unwrap();

        let events = storage.get_events_for_admission("adm-1").unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.admission_id == "adm-1"));
    }

    #[test]
    fn test_get_events_since() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.store_event(&txn, &create_test_event("adm-1", 1)).unwrap();
        storage.store_event(&txn, &create_test_event("adm-2", 2)).unwrap();
        storage.store_event(&txn, &create_test_event("adm-1", 3)).unwrap();
        txn.commit().unwrap();

        // Get events since sequence 1
        let events = storage.get_events_since(1).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.sequence > 1));
    }

    #[test]
    fn test_snapshot_storage() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let admission_id = "adm-1";

        // Store snapshot
        let snapshot = create_test_snapshot(admission_id);
        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();
        txn.commit().unwrap();

        // Retrieve snapshot
        let retrieved = storage.get_snapshot(admission_id).unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().admission_id, admission_id);
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_installments() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let snapshot = create_test_snapshot("adm-1");

        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();
        txn.commit().unwrap();

        let retrieved = storage.get_snapshot("adm-1").unwrap().unwrap();
        assert_eq!(retrieved.installments.len(), 3);
        assert_eq!(retrieved.installments[1].amount, 10000.0);
        assert_eq!(retrieved.fee_structure.down_payment, 10000.0);
        assert_eq!(retrieved.state_checksum, snapshot.state_checksum);
    }

    #[test]
    fn test_get_snapshot_txn_sees_uncommitted_write() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let snapshot = create_test_snapshot("adm-1");

        let txn = storage.begin_write().unwrap();
        storage.store_snapshot(&txn, &snapshot).unwrap();

        // Visible inside the same transaction before commit
        let inside = storage.get_snapshot_txn(&txn, "adm-1").unwrap();
        assert!(inside.is_some());
        txn.commit().unwrap();
    }

    #[test]
    fn test_student_index() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        let mut first = create_test_snapshot("adm-1");
        first.student_id = "stu-a".to_string();
        let mut second = create_test_snapshot("adm-2");
        second.student_id = "stu-a".to_string();
        let mut other = create_test_snapshot("adm-3");
        other.student_id = "stu-b".to_string();

        let txn = storage.begin_write().unwrap();
        for snapshot in [&first, &second, &other] {
            storage.store_snapshot(&txn, snapshot).unwrap();
            storage
                .link_student_admission(&txn, &snapshot.student_id, &snapshot.admission_id)
                .unwrap();
        }
        txn.commit().unwrap();

        let ids = storage.get_admission_ids_for_student("stu-a").unwrap();
        assert_eq!(ids, vec!["adm-1".to_string(), "adm-2".to_string()]);

        let snapshots = storage.get_snapshots_for_student("stu-b").unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].admission_id, "adm-3");

        assert!(storage
            .get_admission_ids_for_student("stu-missing")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_get_stats() {
        let storage = LedgerStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.store_event(&txn, &create_test_event("adm-1", 1)).unwrap();
        storage.store_snapshot(&txn, &create_test_snapshot("adm-1")).unwrap();
        storage.mark_command_processed(&txn, "cmd-1").unwrap();
        storage.set_sequence(&txn, 1).unwrap();
        txn.commit().unwrap();
        storage.next_admission_count().unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.event_count, 1);
        assert_eq!(stats.snapshot_count, 1);
        assert_eq!(stats.processed_command_count, 1);
        assert_eq!(stats.current_sequence, 1);
        assert_eq!(stats.admission_count, 1);
    }
}
