//! Unified error codes for the ledger engine
//!
//! This module defines all error codes used across the ledger server and its
//! API clients. Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Admission errors
//! - 5xxx: Payment errors
//! - 6xxx: Concurrency errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Admission ====================
    /// Admission not found
    AdmissionNotFound = 4001,
    /// Admission already registered
    AdmissionAlreadyExists = 4002,
    /// Installment not found on the admission
    InstallmentNotFound = 4003,
    /// Student has no admissions
    StudentNotFound = 4004,
    /// Fee structure totals do not reconcile
    InvalidFeeStructure = 4101,
    /// Installment schedule does not sum to total fees
    ScheduleMismatch = 4102,
    /// Installment schedule malformed (empty, unordered due dates)
    InvalidSchedule = 4103,

    // ==================== 5xxx: Payment ====================
    /// Payment amount is zero, negative, or not a finite number
    InvalidAmount = 5001,
    /// Payment exceeds the outstanding installment amount
    OverpaymentNotAllowed = 5002,
    /// Cheque payment missing cheque number, date, or bank name
    MissingChequeDetails = 5003,
    /// Installment already fully settled
    AlreadySettled = 5004,
    /// Installment has a cheque awaiting clearance
    ClearancePending = 5005,
    /// No cheque is awaiting clearance on the installment
    NoClearancePending = 5006,
    /// No later unsettled installment to carry the shortfall forward to
    NoCarryForwardTarget = 5007,

    // ==================== 6xxx: Concurrency ====================
    /// Aggregate version changed since the caller read it
    ConcurrentModification = 6001,
    /// Command with this id was already processed
    DuplicateCommand = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9003,
    /// Configuration error
    ConfigError = 9004,

    // ==================== 94xx: Storage ====================
    /// Storage full (disk space insufficient)
    StorageFull = 9401,
    /// Out of memory
    OutOfMemory = 9402,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
    /// System busy (IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Admission
            ErrorCode::AdmissionNotFound => "Admission not found",
            ErrorCode::AdmissionAlreadyExists => "Admission already registered",
            ErrorCode::InstallmentNotFound => "Installment not found",
            ErrorCode::StudentNotFound => "Student has no admissions",
            ErrorCode::InvalidFeeStructure => "Fee structure totals do not reconcile",
            ErrorCode::ScheduleMismatch => {
                "Installment schedule plus down payment does not equal total fees"
            }
            ErrorCode::InvalidSchedule => "Installment schedule is malformed",

            // Payment
            ErrorCode::InvalidAmount => "Payment amount must be a positive finite number",
            ErrorCode::OverpaymentNotAllowed => {
                "Payment exceeds the outstanding installment amount"
            }
            ErrorCode::MissingChequeDetails => {
                "Cheque payments require cheque number, cheque date and bank name"
            }
            ErrorCode::AlreadySettled => "Installment is already fully settled",
            ErrorCode::ClearancePending => "Installment has a cheque awaiting clearance",
            ErrorCode::NoClearancePending => "No cheque is awaiting clearance",
            ErrorCode::NoCarryForwardTarget => {
                "No later unsettled installment to carry the shortfall to"
            }

            // Concurrency
            ErrorCode::ConcurrentModification => {
                "Admission was modified concurrently, retry with the current version"
            }
            ErrorCode::DuplicateCommand => "Command was already processed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",

            // Storage
            ErrorCode::StorageFull => "Storage is full",
            ErrorCode::OutOfMemory => "Out of memory",
            ErrorCode::StorageCorrupted => "Storage is corrupted",
            ErrorCode::SystemBusy => "System is busy, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Admission
            4001 => Ok(ErrorCode::AdmissionNotFound),
            4002 => Ok(ErrorCode::AdmissionAlreadyExists),
            4003 => Ok(ErrorCode::InstallmentNotFound),
            4004 => Ok(ErrorCode::StudentNotFound),
            4101 => Ok(ErrorCode::InvalidFeeStructure),
            4102 => Ok(ErrorCode::ScheduleMismatch),
            4103 => Ok(ErrorCode::InvalidSchedule),

            // Payment
            5001 => Ok(ErrorCode::InvalidAmount),
            5002 => Ok(ErrorCode::OverpaymentNotAllowed),
            5003 => Ok(ErrorCode::MissingChequeDetails),
            5004 => Ok(ErrorCode::AlreadySettled),
            5005 => Ok(ErrorCode::ClearancePending),
            5006 => Ok(ErrorCode::NoClearancePending),
            5007 => Ok(ErrorCode::NoCarryForwardTarget),

            // Concurrency
            6001 => Ok(ErrorCode::ConcurrentModification),
            6002 => Ok(ErrorCode::DuplicateCommand),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::TimeoutError),
            9004 => Ok(ErrorCode::ConfigError),

            // Storage
            9401 => Ok(ErrorCode::StorageFull),
            9402 => Ok(ErrorCode::OutOfMemory),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
