use super::snapshot::{AdmissionSnapshot, InstallmentStatus};
use super::types::PaymentMethod;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Admission-level payment status, rolled up from installment states
///
/// Closed set. Precedence: COMPLETED, then OVERDUE, then PARTIAL, then
/// PENDING. A PENDING_CLEARANCE installment does not get its own
/// admission-level label; it contributes only through the due-date rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionPaymentStatus {
    /// Every installment, down payment included, is PAID
    Completed,
    /// At least one unsettled installment is past its due date
    Overdue,
    /// Some money collected, nothing overdue, not yet complete
    Partial,
    /// No money collected yet
    Pending,
}

impl std::fmt::Display for AdmissionPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdmissionPaymentStatus::Completed => "COMPLETED",
            AdmissionPaymentStatus::Overdue => "OVERDUE",
            AdmissionPaymentStatus::Partial => "PARTIAL",
            AdmissionPaymentStatus::Pending => "PENDING",
        };
        write!(f, "{}", s)
    }
}

/// Per-installment row in the admission summary
///
/// `status` is the effective label: a payable installment past its due date
/// shows OVERDUE here even though the stored state stays PENDING/PARTIAL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentSummary {
    pub installment_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub amount: f64,
    pub paid_amount: f64,
    pub status: InstallmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

/// Read-side view of one admission's financial position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionSummary {
    pub admission_id: String,
    pub admission_number: String,
    pub student_id: String,
    pub student_name: String,
    pub course: String,
    pub total_fees: f64,
    pub total_paid: f64,
    pub remaining_amount: f64,
    pub payment_status: AdmissionPaymentStatus,
    pub installments: Vec<InstallmentSummary>,
    /// Optimistic concurrency token for subsequent commands
    pub version: u64,
}

/// Read-side totals across every admission of one student
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentFinancialSummary {
    pub student_id: String,
    pub total_admissions: usize,
    pub total_fees: f64,
    pub total_paid: f64,
    pub total_remaining: f64,
    pub admissions: Vec<AdmissionSummary>,
}

/// Roll installment states up to the admission-level status
///
/// The down payment has no due date and never contributes to OVERDUE. Any
/// other non-PAID installment past due forces OVERDUE, including one whose
/// cheque is still in flight.
pub fn derive_payment_status(snapshot: &AdmissionSnapshot, today: NaiveDate) -> AdmissionPaymentStatus {
    if snapshot.is_fully_paid() {
        return AdmissionPaymentStatus::Completed;
    }

    let any_overdue = snapshot.installments.iter().any(|inst| {
        !inst.is_settled()
            && inst
                .due_date
                .map(|due| due < today)
                .unwrap_or(false)
    });
    if any_overdue {
        return AdmissionPaymentStatus::Overdue;
    }

    if snapshot.total_paid() > 0.0 {
        AdmissionPaymentStatus::Partial
    } else {
        AdmissionPaymentStatus::Pending
    }
}

impl AdmissionSummary {
    /// Derive the summary from a snapshot. Pure, no mutation.
    pub fn from_snapshot(snapshot: &AdmissionSnapshot, today: NaiveDate) -> Self {
        let installments = snapshot
            .installments
            .iter()
            .map(|inst| InstallmentSummary {
                installment_number: inst.installment_number,
                due_date: inst.due_date,
                amount: inst.amount,
                paid_amount: inst.paid_amount,
                status: inst.effective_status(today),
                payment_method: inst.payment_method,
            })
            .collect();

        Self {
            admission_id: snapshot.admission_id.clone(),
            admission_number: snapshot.admission_number.clone(),
            student_id: snapshot.student_id.clone(),
            student_name: snapshot.student_name.clone(),
            course: snapshot.course.clone(),
            total_fees: snapshot.fee_structure.total_fees,
            total_paid: snapshot.total_paid(),
            remaining_amount: snapshot.remaining_amount(),
            payment_status: derive_payment_status(snapshot, today),
            installments,
            version: snapshot.version,
        }
    }
}

impl StudentFinancialSummary {
    /// Sum every admission of one student. Plain sums, no special-casing.
    pub fn from_snapshots(
        student_id: String,
        snapshots: &[AdmissionSnapshot],
        today: NaiveDate,
    ) -> Self {
        let admissions: Vec<AdmissionSummary> = snapshots
            .iter()
            .map(|s| AdmissionSummary::from_snapshot(s, today))
            .collect();

        let total_fees = admissions.iter().map(|a| a.total_fees).sum();
        let total_paid = admissions.iter().map(|a| a.total_paid).sum();
        let total_remaining = admissions.iter().map(|a| a.remaining_amount).sum();

        Self {
            student_id,
            total_admissions: admissions.len(),
            total_fees,
            total_paid,
            total_remaining,
            admissions,
        }
    }
}
