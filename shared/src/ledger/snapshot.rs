//! Admission snapshot - computed state from event stream
//!
//! The snapshot includes a `state_checksum` field for drift detection.
//! Readers can compare their locally computed checksum with the server's
//! to detect if the applier logic has diverged.

use super::types::{ChequeDetails, PaymentMethod};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Installment status
///
/// `Overdue` is a derived label for display, computed from the due date.
/// It is never written to storage. `Rejected` marks a bounced cheque in the
/// payment history; the stored installment reopens to `Pending` or `Partial`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Overdue,
    PendingClearance,
    Rejected,
}

/// A cheque reserved against an installment, waiting for bank clearance
///
/// The amount is held here instead of `paid_amount` so a bounced cheque was
/// never counted as collected money. The `prior_*` fields restore the
/// installment's visible payment method if the cheque bounces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingCheque {
    /// Amount tendered by the cheque
    pub amount: f64,
    /// Carry-forward choice captured at recording time
    #[serde(default)]
    pub carry_forward: bool,
    /// Date the cheque was handed over
    pub received_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_cheque: Option<ChequeDetails>,
}

/// Per-installment mutable state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallmentState {
    /// 1-based schedule position; 0 is the down payment entry
    pub installment_number: u32,
    /// Due date; the down payment has none (it is due at admission)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Current amount owed (grows when a shortfall is carried into it)
    pub amount: f64,
    /// Cumulative settled amount
    #[serde(default)]
    pub paid_amount: f64,
    /// Stored status (never `Overdue` or `Rejected`, see enum docs)
    pub status: InstallmentStatus,
    /// Method of the most recent payment against this installment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    /// Cheque identification, present only when payment_method is CHEQUE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheque: Option<ChequeDetails>,
    /// In-flight cheque reservation, present only while PENDING_CLEARANCE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_cheque: Option<PendingCheque>,
}

impl InstallmentState {
    /// Create a scheduled installment with nothing paid yet
    pub fn new(installment_number: u32, due_date: Option<NaiveDate>, amount: f64) -> Self {
        Self {
            installment_number,
            due_date,
            amount,
            paid_amount: 0.0,
            status: InstallmentStatus::Pending,
            payment_method: None,
            cheque: None,
            pending_cheque: None,
        }
    }

    /// Remaining amount owed on this installment
    pub fn remaining_amount(&self) -> f64 {
        (self.amount - self.paid_amount).max(0.0)
    }

    /// Check if this installment is fully settled
    pub fn is_settled(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }

    /// Check if a payment can currently be recorded against this installment
    pub fn is_payable(&self) -> bool {
        matches!(
            self.status,
            InstallmentStatus::Pending | InstallmentStatus::Partial
        )
    }

    /// Whether this is the down payment entry (number 0)
    pub fn is_down_payment(&self) -> bool {
        self.installment_number == 0
    }

    /// Status for display: `Overdue` replaces `Pending`/`Partial` once the
    /// due date has passed. The down payment has no due date and is never
    /// reported overdue.
    pub fn effective_status(&self, today: NaiveDate) -> InstallmentStatus {
        if self.is_payable() {
            if let Some(due) = self.due_date {
                if due < today {
                    return InstallmentStatus::Overdue;
                }
            }
        }
        self.status
    }

    /// Status the installment returns to after a cheque bounce
    pub fn reopened_status(&self) -> InstallmentStatus {
        if self.paid_amount > 0.0 {
            InstallmentStatus::Partial
        } else {
            InstallmentStatus::Pending
        }
    }
}

/// Fee structure fixed when the admission is registered
///
/// total_fees = base_fees - discount_amount + cgst_amount + sgst_amount.
/// The installment schedule plus the down payment covers total_fees exactly;
/// carry-forward later moves balance between installments, never the total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeStructure {
    pub base_fees: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub cgst_amount: f64,
    #[serde(default)]
    pub sgst_amount: f64,
    pub total_fees: f64,
    pub down_payment: f64,
}

/// Admission snapshot - computed from event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmissionSnapshot {
    /// Admission ID (assigned by server)
    pub admission_id: String,
    /// Human-facing admission number (ADM-xxx)
    pub admission_number: String,
    /// Student this admission belongs to
    pub student_id: String,
    /// Student name
    pub student_name: String,
    /// Course enrolled
    pub course: String,
    /// Fee structure fixed at registration
    pub fee_structure: FeeStructure,
    /// Ordered installments, index 0 is the down payment
    pub installments: Vec<InstallmentState>,
    /// Optimistic concurrency token, incremented once per applied command
    pub version: u64,
    /// Last applied event sequence (for incremental updates)
    pub last_sequence: u64,
    /// Creation timestamp
    pub created_at: i64,
    /// Last update timestamp
    pub updated_at: i64,
    /// State checksum for drift detection (hex string)
    /// Computed from: installments.len, total_fees, total_paid,
    /// last_sequence, version
    #[serde(default)]
    pub state_checksum: String,
}

impl AdmissionSnapshot {
    /// Create a new empty admission shell
    ///
    /// The registration event fills in the fee structure and schedule.
    pub fn new(admission_id: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let mut snapshot = Self {
            admission_id,
            admission_number: String::new(),
            student_id: String::new(),
            student_name: String::new(),
            course: String::new(),
            fee_structure: FeeStructure {
                base_fees: 0.0,
                discount_amount: 0.0,
                cgst_amount: 0.0,
                sgst_amount: 0.0,
                total_fees: 0.0,
                down_payment: 0.0,
            },
            installments: Vec::new(),
            version: 0,
            last_sequence: 0,
            created_at: now,
            updated_at: now,
            state_checksum: String::new(),
        };
        snapshot.update_checksum();
        snapshot
    }

    /// Look up an installment by number
    pub fn installment(&self, number: u32) -> Option<&InstallmentState> {
        self.installments
            .iter()
            .find(|i| i.installment_number == number)
    }

    /// Mutable lookup, used by event appliers
    pub fn installment_mut(&mut self, number: u32) -> Option<&mut InstallmentState> {
        self.installments
            .iter_mut()
            .find(|i| i.installment_number == number)
    }

    /// Total settled money across all installments
    ///
    /// Pending cheques are reserved outside `paid_amount`, so a plain sum
    /// never counts uncleared money.
    pub fn total_paid(&self) -> f64 {
        self.installments.iter().map(|i| i.paid_amount).sum()
    }

    /// Remaining amount owed across the whole admission
    pub fn remaining_amount(&self) -> f64 {
        (self.fee_structure.total_fees - self.total_paid()).max(0.0)
    }

    /// Check if every installment (including the down payment) is settled
    pub fn is_fully_paid(&self) -> bool {
        !self.installments.is_empty() && self.installments.iter().all(|i| i.is_settled())
    }

    /// Find the carry-forward target after `from`: the next-higher numbered
    /// installment that is not already settled and has no cheque awaiting
    /// clearance. The down payment is never a target.
    pub fn next_carry_target(&self, from: u32) -> Option<u32> {
        self.installments
            .iter()
            .filter(|i| i.installment_number > from && !i.is_down_payment())
            .filter(|i| !i.is_settled() && i.pending_cheque.is_none())
            .map(|i| i.installment_number)
            .min()
    }

    /// Compute state checksum for drift detection
    ///
    /// Returns a 16-character hex string over the fields that must match
    /// after replaying the same events.
    pub fn compute_checksum(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher as _;

        let mut hasher = DefaultHasher::new();

        // Hash installment count
        self.installments.len().hash(&mut hasher);

        // Hash total fees in paise (avoid float precision issues)
        ((self.fee_structure.total_fees * 100.0).round() as i64).hash(&mut hasher);

        // Hash settled money in paise
        ((self.total_paid() * 100.0).round() as i64).hash(&mut hasher);

        // Hash last sequence
        self.last_sequence.hash(&mut hasher);

        // Hash version token
        self.version.hash(&mut hasher);

        // Return as hex string
        format!("{:016x}", hasher.finish())
    }

    /// Update the state_checksum field based on current state
    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    /// Verify that the state_checksum matches computed checksum
    /// Returns true if checksum matches, false if drift detected
    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}

impl Default for AdmissionSnapshot {
    fn default() -> Self {
        Self::new(String::new())
    }
}
