use super::event::{EventPayload, LedgerEvent};
use super::snapshot::InstallmentStatus;
use super::types::PaymentMethod;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the append-only payment audit trail
///
/// Entries are derived from the event stream, never stored separately, so
/// the trail can never drift from the events that produced the snapshot.
/// `paid_amount` is the amount tendered in that single event; summing it is
/// NOT how totals are computed (a bounced cheque's tender is listed here but
/// never became paid money).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    pub installment_number: u32,
    /// Installment amount owed at the time of the entry
    pub amount: f64,
    /// Amount tendered in this event
    pub paid_amount: f64,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub received_date: NaiveDate,
    /// Status this entry produced (REJECTED marks a bounced cheque here even
    /// though the installment itself reopens to PENDING or PARTIAL)
    pub status: InstallmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Server timestamp of the underlying event (Unix milliseconds)
    pub created_at: i64,
}

impl PaymentHistoryEntry {
    /// Build the audit row for a payment-bearing event
    ///
    /// Returns `None` for events that carry no payment (registration).
    pub fn from_event(event: &LedgerEvent) -> Option<Self> {
        match &event.payload {
            EventPayload::AdmissionRegistered { .. } => None,

            EventPayload::PaymentRecorded {
                installment_number,
                amount,
                paid_amount,
                payment_method,
                transaction_id,
                received_date,
                status,
                remarks,
                ..
            } => Some(Self {
                installment_number: *installment_number,
                amount: *amount,
                paid_amount: *paid_amount,
                payment_method: *payment_method,
                transaction_id: transaction_id.clone(),
                received_date: *received_date,
                status: *status,
                remarks: remarks.clone(),
                created_at: event.timestamp,
            }),

            EventPayload::ChequeRecorded {
                installment_number,
                amount,
                pending_amount,
                transaction_id,
                received_date,
                remarks,
                ..
            } => Some(Self {
                installment_number: *installment_number,
                amount: *amount,
                paid_amount: *pending_amount,
                payment_method: PaymentMethod::Cheque,
                transaction_id: transaction_id.clone(),
                received_date: *received_date,
                status: InstallmentStatus::PendingClearance,
                remarks: remarks.clone(),
                created_at: event.timestamp,
            }),

            EventPayload::ChequeCleared {
                installment_number,
                amount,
                settled_amount,
                received_date,
                status,
                remark,
                ..
            } => Some(Self {
                installment_number: *installment_number,
                amount: *amount,
                paid_amount: *settled_amount,
                payment_method: PaymentMethod::Cheque,
                transaction_id: None,
                received_date: *received_date,
                status: *status,
                remarks: remark.clone(),
                created_at: event.timestamp,
            }),

            EventPayload::ChequeBounced {
                installment_number,
                amount,
                pending_amount,
                received_date,
                remark,
                ..
            } => Some(Self {
                installment_number: *installment_number,
                amount: *amount,
                paid_amount: *pending_amount,
                payment_method: PaymentMethod::Cheque,
                transaction_id: None,
                received_date: *received_date,
                status: InstallmentStatus::Rejected,
                remarks: remark.clone(),
                created_at: event.timestamp,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::event::LedgerEventType;
    use crate::ledger::types::ChequeDetails;

    fn base_event(event_type: LedgerEventType, payload: EventPayload) -> LedgerEvent {
        LedgerEvent::new(
            1,
            "adm-1".to_string(),
            "op-1".to_string(),
            "Accounts Desk".to_string(),
            "cmd-1".to_string(),
            None,
            event_type,
            payload,
        )
    }

    #[test]
    fn test_registration_produces_no_entry() {
        let event = base_event(
            LedgerEventType::AdmissionRegistered,
            EventPayload::AdmissionRegistered {
                admission_number: "ADM202501010001".to_string(),
                student_id: "stu-1".to_string(),
                student_name: "Asha Rao".to_string(),
                course: "B.Sc. Physics".to_string(),
                fee_structure: crate::ledger::snapshot::FeeStructure {
                    base_fees: 30000.0,
                    discount_amount: 0.0,
                    cgst_amount: 0.0,
                    sgst_amount: 0.0,
                    total_fees: 30000.0,
                    down_payment: 6000.0,
                },
                schedule: vec![],
            },
        );

        assert!(PaymentHistoryEntry::from_event(&event).is_none());
    }

    #[test]
    fn test_cash_payment_entry() {
        let event = base_event(
            LedgerEventType::PaymentRecorded,
            EventPayload::PaymentRecorded {
                installment_number: 2,
                amount: 10000.0,
                paid_amount: 10000.0,
                payment_method: PaymentMethod::Cash,
                transaction_id: None,
                received_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                status: InstallmentStatus::Paid,
                carry: None,
                remarks: Some("counter receipt 88".to_string()),
            },
        );

        let entry = PaymentHistoryEntry::from_event(&event).unwrap();
        assert_eq!(entry.installment_number, 2);
        assert_eq!(entry.amount, 10000.0);
        assert_eq!(entry.paid_amount, 10000.0);
        assert_eq!(entry.payment_method, PaymentMethod::Cash);
        assert_eq!(entry.status, InstallmentStatus::Paid);
        assert_eq!(entry.created_at, event.timestamp);
        assert_eq!(entry.remarks.as_deref(), Some("counter receipt 88"));
    }

    #[test]
    fn test_bounced_cheque_entry_is_rejected() {
        let event = base_event(
            LedgerEventType::ChequeBounced,
            EventPayload::ChequeBounced {
                installment_number: 1,
                amount: 6000.0,
                pending_amount: 6000.0,
                received_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                reopened_status: InstallmentStatus::Pending,
                remark: Some("signature mismatch".to_string()),
            },
        );

        let entry = PaymentHistoryEntry::from_event(&event).unwrap();
        // The audit row keeps REJECTED even though the installment reopens
        assert_eq!(entry.status, InstallmentStatus::Rejected);
        assert_eq!(entry.payment_method, PaymentMethod::Cheque);
        assert_eq!(entry.paid_amount, 6000.0);
    }

    #[test]
    fn test_cleared_cheque_keeps_original_received_date() {
        let received = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let event = base_event(
            LedgerEventType::ChequeCleared,
            EventPayload::ChequeCleared {
                installment_number: 1,
                amount: 6000.0,
                settled_amount: 6000.0,
                received_date: received,
                status: InstallmentStatus::Paid,
                carry: None,
                remark: None,
            },
        );

        let entry = PaymentHistoryEntry::from_event(&event).unwrap();
        assert_eq!(entry.received_date, received);
        assert_eq!(entry.status, InstallmentStatus::Paid);
    }

    #[test]
    fn test_cheque_record_entry_uses_pending_amount() {
        let event = base_event(
            LedgerEventType::ChequeRecorded,
            EventPayload::ChequeRecorded {
                installment_number: 1,
                amount: 6000.0,
                pending_amount: 6000.0,
                cheque: ChequeDetails {
                    cheque_number: "CHQ123".to_string(),
                    cheque_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                    bank_name: "HDFC".to_string(),
                },
                transaction_id: None,
                received_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                carry_forward: false,
                remarks: None,
            },
        );

        let entry = PaymentHistoryEntry::from_event(&event).unwrap();
        assert_eq!(entry.status, InstallmentStatus::PendingClearance);
        assert_eq!(entry.paid_amount, 6000.0);
    }
}
