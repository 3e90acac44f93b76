//! Admission payment ledger - event sourcing types
//!
//! Commands express intent, events record what happened, snapshots are the
//! current state derived from events. The payment history shown to callers
//! is a projection of the same events, so audit trail and state can never
//! disagree.
//!
//! ```text
//! LedgerCommand --> validation --> LedgerEvent --> AdmissionSnapshot
//!                                      |
//!                                      +--> PaymentHistoryEntry (audit)
//!                                      +--> AdmissionSummary (read side)
//! ```

pub mod command;
pub mod event;
pub mod history;
pub mod snapshot;
pub mod summary;
pub mod types;

pub use command::{LedgerCommand, LedgerCommandPayload};
pub use event::{CarryForwardShift, EventPayload, LedgerEvent, LedgerEventType};
pub use history::PaymentHistoryEntry;
pub use snapshot::{
    AdmissionSnapshot, FeeStructure, InstallmentState, InstallmentStatus, PendingCheque,
};
pub use summary::{
    AdmissionPaymentStatus, AdmissionSummary, InstallmentSummary, StudentFinancialSummary,
    derive_payment_status,
};
pub use types::{
    AdmissionInput, ChequeDetails, ClearanceDecision, CommandError, CommandErrorCode,
    CommandResponse, InstallmentScheduleInput, PaymentInput, PaymentMethod,
};
