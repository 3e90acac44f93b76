use super::super::storage::StorageError;
use super::super::traits::LedgerError;
use shared::ledger::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

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

    #[error("Admission {admission_id} is at version {actual}, command expected {expected}")]
    ConcurrentModification {
        admission_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Map a storage failure to the closest command error code; the exact
/// message still travels with it for logs.
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::AdmissionNotFound(_) => return CommandErrorCode::AdmissionNotFound,
        StorageError::EventNotFound(_, _) => return CommandErrorCode::InternalError,
        _ => {}
    }

    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // redb Database/Transaction/Table/Storage/Commit errors
    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let (code, message) = match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                let message = e.to_string();
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, message)
            }
            ManagerError::AdmissionNotFound(id) => (
                CommandErrorCode::AdmissionNotFound,
                format!("Admission not found: {}", id),
            ),
            ManagerError::AdmissionAlreadyExists(id) => (
                CommandErrorCode::AdmissionAlreadyExists,
                format!("Admission already exists: {}", id),
            ),
            ManagerError::InstallmentNotFound(admission_id, number) => (
                CommandErrorCode::InstallmentNotFound,
                format!(
                    "Installment {} not found on admission {}",
                    number, admission_id
                ),
            ),
            ManagerError::AlreadySettled(number) => (
                CommandErrorCode::AlreadySettled,
                format!("Installment {} is already fully paid", number),
            ),
            ManagerError::ClearancePending(number) => (
                CommandErrorCode::ClearancePending,
                format!("Installment {} has a cheque awaiting clearance", number),
            ),
            ManagerError::NoClearancePending(number) => (
                CommandErrorCode::NoClearancePending,
                format!("Installment {} has no cheque awaiting clearance", number),
            ),
            ManagerError::OverpaymentNotAllowed {
                tendered,
                outstanding,
            } => (
                CommandErrorCode::OverpaymentNotAllowed,
                format!(
                    "Tendered amount {:.2} exceeds outstanding {:.2}",
                    tendered, outstanding
                ),
            ),
            ManagerError::MissingChequeDetails => (
                CommandErrorCode::MissingChequeDetails,
                "Cheque payments require cheque number, cheque date and bank name".to_string(),
            ),
            ManagerError::NoCarryForwardTarget(number) => (
                CommandErrorCode::NoCarryForwardTarget,
                format!(
                    "No unsettled later installment can absorb the shortfall from installment {}",
                    number
                ),
            ),
            ManagerError::InvalidAmount => (
                CommandErrorCode::InvalidAmount,
                "Invalid amount".to_string(),
            ),
            ManagerError::InvalidFeeStructure(msg) => (CommandErrorCode::InvalidFeeStructure, msg),
            ManagerError::ScheduleMismatch(msg) => (CommandErrorCode::ScheduleMismatch, msg),
            ManagerError::InvalidSchedule(msg) => (CommandErrorCode::InvalidSchedule, msg),
            ManagerError::ConcurrentModification {
                admission_id,
                expected,
                actual,
            } => (
                CommandErrorCode::ConcurrentModification,
                format!(
                    "Admission {} is at version {}, command expected {}",
                    admission_id, actual, expected
                ),
            ),
            ManagerError::InvalidOperation(msg) => (CommandErrorCode::InvalidOperation, msg),
            ManagerError::Internal(msg) => (CommandErrorCode::InternalError, msg),
        };
        CommandError::new(code, message)
    }
}

impl From<LedgerError> for ManagerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AdmissionNotFound(id) => ManagerError::AdmissionNotFound(id),
            LedgerError::AdmissionAlreadyExists(id) => ManagerError::AdmissionAlreadyExists(id),
            LedgerError::InstallmentNotFound(id, number) => {
                ManagerError::InstallmentNotFound(id, number)
            }
            LedgerError::AlreadySettled(number) => ManagerError::AlreadySettled(number),
            LedgerError::ClearancePending(number) => ManagerError::ClearancePending(number),
            LedgerError::NoClearancePending(number) => ManagerError::NoClearancePending(number),
            LedgerError::OverpaymentNotAllowed {
                tendered,
                outstanding,
            } => ManagerError::OverpaymentNotAllowed {
                tendered,
                outstanding,
            },
            LedgerError::MissingChequeDetails => ManagerError::MissingChequeDetails,
            LedgerError::NoCarryForwardTarget(number) => {
                ManagerError::NoCarryForwardTarget(number)
            }
            LedgerError::InvalidAmount => ManagerError::InvalidAmount,
            LedgerError::InvalidFeeStructure(msg) => ManagerError::InvalidFeeStructure(msg),
            LedgerError::ScheduleMismatch(msg) => ManagerError::ScheduleMismatch(msg),
            LedgerError::InvalidSchedule(msg) => ManagerError::InvalidSchedule(msg),
            LedgerError::InvalidOperation(msg) => ManagerError::InvalidOperation(msg),
            LedgerError::Storage(msg) => ManagerError::Internal(msg),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
