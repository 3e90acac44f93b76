//! Shared types for the ledger event sourcing system

use crate::error::ErrorCode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Payment Method
// ============================================================================

/// Payment method accepted by the fee counter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Card,
    BankTransfer,
    /// Two-phase: recorded first, settled or bounced on clearance
    Cheque,
}

impl PaymentMethod {
    /// Whether money is considered collected the moment it is recorded
    pub fn is_immediate(&self) -> bool {
        !matches!(self, PaymentMethod::Cheque)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "CASH"),
            PaymentMethod::Upi => write!(f, "UPI"),
            PaymentMethod::Card => write!(f, "CARD"),
            PaymentMethod::BankTransfer => write!(f, "BANK_TRANSFER"),
            PaymentMethod::Cheque => write!(f, "CHEQUE"),
        }
    }
}

// ============================================================================
// Cheque
// ============================================================================

/// Cheque identification captured when a cheque payment is recorded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChequeDetails {
    pub cheque_number: String,
    pub cheque_date: NaiveDate,
    pub bank_name: String,
}

/// Clearance decision for a recorded cheque
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearanceDecision {
    /// Cheque cleared at the bank, settle the reserved amount
    Approve,
    /// Cheque bounced, reopen the installment
    Reject,
}

// ============================================================================
// Payment Input
// ============================================================================

/// Payment input for recording a payment against one installment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    /// Amount tendered in this payment
    pub paid_amount: f64,
    pub payment_method: PaymentMethod,
    /// Free-text reference for non-cheque methods (UPI ref, card auth code)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Required when payment_method is CHEQUE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheque_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheque_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    /// Date the money was actually received (may differ from the record time)
    pub received_date: NaiveDate,
    /// On a short payment, close this installment and move the shortfall to
    /// the next unsettled installment
    #[serde(default)]
    pub carry_forward: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl PaymentInput {
    /// Extract validated cheque details, if all three fields are present and
    /// non-empty. Returns None otherwise; the recorder turns that into
    /// `MissingChequeDetails`.
    pub fn cheque_details(&self) -> Option<ChequeDetails> {
        let number = self.cheque_number.as_deref()?.trim();
        let bank = self.bank_name.as_deref()?.trim();
        let date = self.cheque_date?;
        if number.is_empty() || bank.is_empty() {
            return None;
        }
        Some(ChequeDetails {
            cheque_number: number.to_string(),
            cheque_date: date,
            bank_name: bank.to_string(),
        })
    }
}

// ============================================================================
// Admission Registration Input
// ============================================================================

/// One scheduled installment at registration time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentScheduleInput {
    pub due_date: NaiveDate,
    pub amount: f64,
}

/// Full registration input: who is admitted and what they owe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionInput {
    pub student_id: String,
    pub student_name: String,
    pub course: String,
    pub base_fees: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub cgst_amount: f64,
    #[serde(default)]
    pub sgst_amount: f64,
    /// Must equal base − discount + cgst + sgst
    pub total_fees: f64,
    pub down_payment: f64,
    /// 1-based schedule; the down payment becomes installment 0
    pub installments: Vec<InstallmentScheduleInput>,
}

// ============================================================================
// Command Response
// ============================================================================

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// Admission the command applied to (assigned for RegisterAdmission)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_id: Option<String>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, admission_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            admission_id,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            admission_id: None,
            error: Some(error),
        }
    }

    pub fn duplicate(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            admission_id: None,
            error: None,
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Command error codes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    AdmissionNotFound,
    InstallmentNotFound,
    AdmissionAlreadyExists,
    InvalidFeeStructure,
    ScheduleMismatch,
    InvalidSchedule,
    InvalidAmount,
    OverpaymentNotAllowed,
    MissingChequeDetails,
    AlreadySettled,
    ClearancePending,
    NoClearancePending,
    NoCarryForwardTarget,
    ConcurrentModification,
    InvalidOperation,
    DuplicateCommand,
    InternalError,
    // Storage errors (maps to ErrorCode 94xx)
    StorageFull,
    OutOfMemory,
    StorageCorrupted,
    SystemBusy,
}

impl From<CommandErrorCode> for ErrorCode {
    fn from(code: CommandErrorCode) -> Self {
        match code {
            CommandErrorCode::AdmissionNotFound => ErrorCode::AdmissionNotFound,
            CommandErrorCode::InstallmentNotFound => ErrorCode::InstallmentNotFound,
            CommandErrorCode::AdmissionAlreadyExists => ErrorCode::AdmissionAlreadyExists,
            CommandErrorCode::InvalidFeeStructure => ErrorCode::InvalidFeeStructure,
            CommandErrorCode::ScheduleMismatch => ErrorCode::ScheduleMismatch,
            CommandErrorCode::InvalidSchedule => ErrorCode::InvalidSchedule,
            CommandErrorCode::InvalidAmount => ErrorCode::InvalidAmount,
            CommandErrorCode::OverpaymentNotAllowed => ErrorCode::OverpaymentNotAllowed,
            CommandErrorCode::MissingChequeDetails => ErrorCode::MissingChequeDetails,
            CommandErrorCode::AlreadySettled => ErrorCode::AlreadySettled,
            CommandErrorCode::ClearancePending => ErrorCode::ClearancePending,
            CommandErrorCode::NoClearancePending => ErrorCode::NoClearancePending,
            CommandErrorCode::NoCarryForwardTarget => ErrorCode::NoCarryForwardTarget,
            CommandErrorCode::ConcurrentModification => ErrorCode::ConcurrentModification,
            CommandErrorCode::InvalidOperation => ErrorCode::InvalidRequest,
            CommandErrorCode::DuplicateCommand => ErrorCode::DuplicateCommand,
            CommandErrorCode::InternalError => ErrorCode::InternalError,
            CommandErrorCode::StorageFull => ErrorCode::StorageFull,
            CommandErrorCode::OutOfMemory => ErrorCode::OutOfMemory,
            CommandErrorCode::StorageCorrupted => ErrorCode::StorageCorrupted,
            CommandErrorCode::SystemBusy => ErrorCode::SystemBusy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_wire_format() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"BANK_TRANSFER\"");
        let m: PaymentMethod = serde_json::from_str("\"CHEQUE\"").unwrap();
        assert_eq!(m, PaymentMethod::Cheque);
    }

    #[test]
    fn test_immediate_methods() {
        assert!(PaymentMethod::Cash.is_immediate());
        assert!(PaymentMethod::Upi.is_immediate());
        assert!(PaymentMethod::Card.is_immediate());
        assert!(PaymentMethod::BankTransfer.is_immediate());
        assert!(!PaymentMethod::Cheque.is_immediate());
    }

    #[test]
    fn test_cheque_details_extraction() {
        let mut input = PaymentInput {
            paid_amount: 6000.0,
            payment_method: PaymentMethod::Cheque,
            transaction_id: None,
            cheque_number: Some("CHQ123".to_string()),
            cheque_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            bank_name: Some("HDFC".to_string()),
            received_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            carry_forward: false,
            remarks: None,
        };

        let details = input.cheque_details().unwrap();
        assert_eq!(details.cheque_number, "CHQ123");
        assert_eq!(details.bank_name, "HDFC");

        // Whitespace-only bank name is treated as missing
        input.bank_name = Some("   ".to_string());
        assert!(input.cheque_details().is_none());

        input.bank_name = None;
        assert!(input.cheque_details().is_none());
    }

    #[test]
    fn test_command_response_constructors() {
        let ok = CommandResponse::success("cmd-1".to_string(), Some("adm-1".to_string()));
        assert!(ok.success);
        assert_eq!(ok.admission_id.as_deref(), Some("adm-1"));
        assert!(ok.error.is_none());

        let err = CommandResponse::error(
            "cmd-2".to_string(),
            CommandError::new(CommandErrorCode::InvalidAmount, "amount must be positive"),
        );
        assert!(!err.success);
        assert_eq!(
            err.error.unwrap().code,
            CommandErrorCode::InvalidAmount
        );

        let dup = CommandResponse::duplicate("cmd-3".to_string());
        assert!(dup.success);
        assert!(dup.error.is_none());
    }

    #[test]
    fn test_command_error_code_to_error_code() {
        let code: ErrorCode = CommandErrorCode::OverpaymentNotAllowed.into();
        assert_eq!(code, ErrorCode::OverpaymentNotAllowed);
        let code: ErrorCode = CommandErrorCode::SystemBusy.into();
        assert_eq!(code, ErrorCode::SystemBusy);
    }
}
