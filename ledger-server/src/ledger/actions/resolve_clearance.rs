//! ResolveClearance command handler
//!
//! Second phase of cheque handling: approve settles the reserved amount,
//! reject reopens the installment as payable.

use async_trait::async_trait;

use super::record_payment::settle_against_outstanding;
use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use shared::ledger::{
    ClearanceDecision, EventPayload, InstallmentStatus, LedgerEvent, LedgerEventType,
};

/// ResolveClearance action
#[derive(Debug, Clone)]
pub struct ResolveClearanceAction {
    pub admission_id: String,
    pub installment_number: u32,
    pub decision: ClearanceDecision,
    pub remark: Option<String>,
}

#[async_trait]
impl CommandHandler for ResolveClearanceAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        // 1. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.admission_id)?;

        // 2. Locate the target installment
        let installment = snapshot.installment(self.installment_number).ok_or_else(|| {
            LedgerError::InstallmentNotFound(self.admission_id.clone(), self.installment_number)
        })?;

        // 3. Installment must hold a cheque awaiting clearance
        if installment.status != InstallmentStatus::PendingClearance {
            return Err(LedgerError::NoClearancePending(self.installment_number));
        }
        let pending = installment.pending_cheque.as_ref().ok_or_else(|| {
            LedgerError::InvalidOperation(format!(
                "Installment {} awaits clearance but holds no reserved cheque",
                self.installment_number
            ))
        })?;

        // 4. Build the resolution event
        let event = match self.decision {
            ClearanceDecision::Approve => {
                // Settle the reserved amount under the same rule as an
                // immediate payment against the current outstanding amount
                let (status, carry) = settle_against_outstanding(
                    &snapshot,
                    installment,
                    pending.amount,
                    pending.carry_forward,
                )?;

                let seq = ctx.next_sequence();
                LedgerEvent::new(
                    seq,
                    self.admission_id.clone(),
                    metadata.operator_id.clone(),
                    metadata.operator_name.clone(),
                    metadata.command_id.clone(),
                    Some(metadata.timestamp),
                    LedgerEventType::ChequeCleared,
                    EventPayload::ChequeCleared {
                        installment_number: self.installment_number,
                        amount: installment.amount,
                        settled_amount: pending.amount,
                        // History keeps the date the cheque was handed over,
                        // not the clearance date
                        received_date: pending.received_date,
                        status,
                        carry,
                        remark: self.remark.clone(),
                    },
                )
            }
            ClearanceDecision::Reject => {
                let seq = ctx.next_sequence();
                LedgerEvent::new(
                    seq,
                    self.admission_id.clone(),
                    metadata.operator_id.clone(),
                    metadata.operator_name.clone(),
                    metadata.command_id.clone(),
                    Some(metadata.timestamp),
                    LedgerEventType::ChequeBounced,
                    EventPayload::ChequeBounced {
                        installment_number: self.installment_number,
                        amount: installment.amount,
                        pending_amount: pending.amount,
                        received_date: pending.received_date,
                        reopened_status: installment.reopened_status(),
                        remark: self.remark.clone(),
                    },
                )
            }
        };

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::storage::LedgerStorage;
    use crate::ledger::traits::CommandContext;
    use chrono::NaiveDate;
    use shared::ledger::{
        AdmissionSnapshot, ChequeDetails, InstallmentState, PaymentMethod, PendingCheque,
    };

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            operator_id: "user-1".to_string(),
            operator_name: "Test User".to_string(),
            timestamp: 1234567890,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_cheque() -> ChequeDetails {
        ChequeDetails {
            cheque_number: "CHQ445566".to_string(),
            cheque_date: day(2025, 3, 1),
            bank_name: "HDFC".to_string(),
        }
    }

    /// Admission whose installment 2 holds a cheque awaiting clearance
    fn snapshot_with_pending(
        admission_id: &str,
        pending_amount: f64,
        carry_forward: bool,
    ) -> AdmissionSnapshot {
        let mut snapshot = AdmissionSnapshot::new(admission_id.to_string());
        snapshot.admission_number = "ADM2025011510001".to_string();
        snapshot.student_id = "stu-1".to_string();
        snapshot.student_name = "Asha Verma".to_string();
        snapshot.course = "B.Sc Physics".to_string();
        snapshot.fee_structure.base_fees = 30000.0;
        snapshot.fee_structure.total_fees = 30000.0;
        snapshot.fee_structure.down_payment = 6000.0;
        snapshot.installments = vec![
            InstallmentState::new(0, None, 6000.0),
            InstallmentState::new(1, Some(day(2025, 2, 10)), 8000.0),
            InstallmentState::new(2, Some(day(2025, 3, 10)), 8000.0),
            InstallmentState::new(3, Some(day(2025, 4, 10)), 8000.0),
        ];
        snapshot.installments[2].status = InstallmentStatus::PendingClearance;
        snapshot.installments[2].payment_method = Some(PaymentMethod::Cheque);
        snapshot.installments[2].cheque = Some(test_cheque());
        snapshot.installments[2].pending_cheque = Some(PendingCheque {
            amount: pending_amount,
            carry_forward,
            received_date: day(2025, 3, 1),
            prior_method: None,
            prior_cheque: None,
        });
        snapshot.update_checksum();
        snapshot
    }

    async fn run(
        snapshot: AdmissionSnapshot,
        installment_number: u32,
        decision: ClearanceDecision,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let admission_id = snapshot.admission_id.clone();
        storage.store_snapshot(&txn, &snapshot).unwrap();

        let current_seq = storage.get_next_sequence(&txn).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, current_seq);

        let action = ResolveClearanceAction {
            admission_id,
            installment_number,
            decision,
            remark: None,
        };

        action.execute(&mut ctx, &create_test_metadata()).await
    }

    #[tokio::test]
    async fn test_approve_full_cheque_settles() {
        let snapshot = snapshot_with_pending("adm-1", 8000.0, false);
        let events = run(snapshot, 2, ClearanceDecision::Approve).await.unwrap();

        assert_eq!(events[0].event_type, LedgerEventType::ChequeCleared);
        if let EventPayload::ChequeCleared {
            status,
            settled_amount,
            received_date,
            carry,
            ..
        } = &events[0].payload
        {
            assert_eq!(*status, InstallmentStatus::Paid);
            assert_eq!(*settled_amount, 8000.0);
            // Original hand-over date, not the clearance date
            assert_eq!(*received_date, day(2025, 3, 1));
            assert!(carry.is_none());
        } else {
            panic!("Expected ChequeCleared payload");
        }
    }

    #[tokio::test]
    async fn test_approve_partial_cheque_stays_partial() {
        let snapshot = snapshot_with_pending("adm-1", 5000.0, false);
        let events = run(snapshot, 2, ClearanceDecision::Approve).await.unwrap();

        if let EventPayload::ChequeCleared { status, carry, .. } = &events[0].payload {
            assert_eq!(*status, InstallmentStatus::Partial);
            assert!(carry.is_none());
        } else {
            panic!("Expected ChequeCleared payload");
        }
    }

    #[tokio::test]
    async fn test_approve_with_carry_shifts_shortfall() {
        let snapshot = snapshot_with_pending("adm-1", 5000.0, true);
        let events = run(snapshot, 2, ClearanceDecision::Approve).await.unwrap();

        if let EventPayload::ChequeCleared { status, carry, .. } = &events[0].payload {
            assert_eq!(*status, InstallmentStatus::Paid);
            let shift = carry.expect("carry shift expected");
            assert_eq!(shift.target_installment, 3);
            assert_eq!(shift.amount, 3000.0);
        } else {
            panic!("Expected ChequeCleared payload");
        }
    }

    #[tokio::test]
    async fn test_approve_with_carry_but_no_target_fails() {
        let mut snapshot = snapshot_with_pending("adm-1", 5000.0, true);
        // Close every later installment
        snapshot.installments[3].paid_amount = 8000.0;
        snapshot.installments[3].status = InstallmentStatus::Paid;

        let result = run(snapshot, 2, ClearanceDecision::Approve).await;
        assert!(matches!(result, Err(LedgerError::NoCarryForwardTarget(2))));
    }

    #[tokio::test]
    async fn test_reject_reopens_pending() {
        let snapshot = snapshot_with_pending("adm-1", 8000.0, false);
        let events = run(snapshot, 2, ClearanceDecision::Reject).await.unwrap();

        assert_eq!(events[0].event_type, LedgerEventType::ChequeBounced);
        if let EventPayload::ChequeBounced {
            reopened_status,
            pending_amount,
            amount,
            ..
        } = &events[0].payload
        {
            assert_eq!(*reopened_status, InstallmentStatus::Pending);
            assert_eq!(*pending_amount, 8000.0);
            // The owed amount never moved while the cheque was in flight
            assert_eq!(*amount, 8000.0);
        } else {
            panic!("Expected ChequeBounced payload");
        }
    }

    #[tokio::test]
    async fn test_reject_with_prior_partial_reopens_partial() {
        let mut snapshot = snapshot_with_pending("adm-1", 6000.0, false);
        snapshot.installments[2].paid_amount = 2000.0;

        let events = run(snapshot, 2, ClearanceDecision::Reject).await.unwrap();

        if let EventPayload::ChequeBounced { reopened_status, .. } = &events[0].payload {
            assert_eq!(*reopened_status, InstallmentStatus::Partial);
        } else {
            panic!("Expected ChequeBounced payload");
        }
    }

    #[tokio::test]
    async fn test_resolve_without_pending_cheque_fails() {
        let mut snapshot = snapshot_with_pending("adm-1", 8000.0, false);
        snapshot.installments[2].status = InstallmentStatus::Pending;
        snapshot.installments[2].pending_cheque = None;

        let result = run(snapshot, 2, ClearanceDecision::Approve).await;
        assert!(matches!(result, Err(LedgerError::NoClearancePending(2))));
    }

    #[tokio::test]
    async fn test_resolve_missing_installment_fails() {
        let snapshot = snapshot_with_pending("adm-1", 8000.0, false);
        let result = run(snapshot, 9, ClearanceDecision::Approve).await;
        assert!(matches!(result, Err(LedgerError::InstallmentNotFound(_, 9))));
    }

    #[tokio::test]
    async fn test_resolve_missing_admission_fails() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let current_seq = storage.get_next_sequence(&txn).unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, current_seq);

        let action = ResolveClearanceAction {
            admission_id: "nonexistent".to_string(),
            installment_number: 2,
            decision: ClearanceDecision::Approve,
            remark: None,
        };

        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(LedgerError::AdmissionNotFound(_))));
    }
}
