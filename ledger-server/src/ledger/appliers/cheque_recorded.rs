//! ChequeRecorded event applier
//!
//! Applies the ChequeRecorded event to reserve the cheque amount. Paid
//! money is untouched until clearance.

use crate::ledger::traits::EventApplier;
use shared::ledger::{
    AdmissionSnapshot, EventPayload, InstallmentStatus, LedgerEvent, PaymentMethod, PendingCheque,
};

/// ChequeRecorded applier
pub struct ChequeRecordedApplier;

impl EventApplier for ChequeRecordedApplier {
    fn apply(&self, snapshot: &mut AdmissionSnapshot, event: &LedgerEvent) {
        if let EventPayload::ChequeRecorded {
            installment_number,
            pending_amount,
            cheque,
            received_date,
            carry_forward,
            ..
        } = &event.payload
        {
            if let Some(installment) = snapshot.installment_mut(*installment_number) {
                // Reserve the amount; prior method fields are kept so a
                // bounce can restore them
                installment.pending_cheque = Some(PendingCheque {
                    amount: *pending_amount,
                    carry_forward: *carry_forward,
                    received_date: *received_date,
                    prior_method: installment.payment_method,
                    prior_cheque: installment.cheque.clone(),
                });
                installment.payment_method = Some(PaymentMethod::Cheque);
                installment.cheque = Some(cheque.clone());
                installment.status = InstallmentStatus::PendingClearance;
            }

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;
            snapshot.version += 1;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::ledger::{ChequeDetails, InstallmentState, LedgerEventType};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded_snapshot() -> AdmissionSnapshot {
        let mut snapshot = AdmissionSnapshot::new("adm-1".to_string());
        snapshot.fee_structure.total_fees = 14000.0;
        snapshot.fee_structure.down_payment = 6000.0;
        snapshot.installments = vec![
            InstallmentState::new(0, None, 6000.0),
            InstallmentState::new(1, Some(day(2025, 2, 10)), 8000.0),
        ];
        snapshot.update_checksum();
        snapshot
    }

    fn create_cheque_event(seq: u64, pending_amount: f64, carry_forward: bool) -> LedgerEvent {
        LedgerEvent::new(
            seq,
            "adm-1".to_string(),
            "user-1".to_string(),
            "Test User".to_string(),
            "cmd-1".to_string(),
            Some(1234567890),
            LedgerEventType::ChequeRecorded,
            EventPayload::ChequeRecorded {
                installment_number: 1,
                amount: 8000.0,
                pending_amount,
                cheque: ChequeDetails {
                    cheque_number: "CHQ445566".to_string(),
                    cheque_date: day(2025, 2, 5),
                    bank_name: "HDFC".to_string(),
                },
                transaction_id: None,
                received_date: day(2025, 2, 5),
                carry_forward,
                remarks: None,
            },
        )
    }

    #[test]
    fn test_cheque_reserved_without_settling() {
        let mut snapshot = seeded_snapshot();

        let event = create_cheque_event(1, 6000.0, false);
        ChequeRecordedApplier.apply(&mut snapshot, &event);

        let installment = snapshot.installment(1).unwrap();
        assert_eq!(installment.status, InstallmentStatus::PendingClearance);
        assert_eq!(installment.payment_method, Some(PaymentMethod::Cheque));
        assert_eq!(
            installment.cheque.as_ref().unwrap().cheque_number,
            "CHQ445566"
        );

        let pending = installment.pending_cheque.as_ref().unwrap();
        assert_eq!(pending.amount, 6000.0);
        assert_eq!(pending.received_date, day(2025, 2, 5));
        assert!(!pending.carry_forward);

        // Uncleared money is never counted as paid
        assert_eq!(installment.paid_amount, 0.0);
        assert_eq!(snapshot.total_paid(), 0.0);
    }

    #[test]
    fn test_cheque_preserves_prior_method_for_bounce() {
        let mut snapshot = seeded_snapshot();
        snapshot.installments[1].paid_amount = 2000.0;
        snapshot.installments[1].status = InstallmentStatus::Partial;
        snapshot.installments[1].payment_method = Some(PaymentMethod::Cash);

        let event = create_cheque_event(1, 6000.0, true);
        ChequeRecordedApplier.apply(&mut snapshot, &event);

        let pending = snapshot
            .installment(1)
            .unwrap()
            .pending_cheque
            .as_ref()
            .unwrap();
        assert_eq!(pending.prior_method, Some(PaymentMethod::Cash));
        assert!(pending.carry_forward);
    }

    #[test]
    fn test_cheque_updates_sequence_and_checksum() {
        let mut snapshot = seeded_snapshot();
        let initial_checksum = snapshot.state_checksum.clone();

        let event = create_cheque_event(7, 6000.0, false);
        ChequeRecordedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.last_sequence, 7);
        assert_eq!(snapshot.version, 1);
        assert_ne!(snapshot.state_checksum, initial_checksum);
        assert!(snapshot.verify_checksum());
    }
}
