//! RecordPayment command handler
//!
//! Records a payment against one installment. Immediate methods (CASH,
//! UPI, CARD, BANK_TRANSFER) settle on the spot; CHEQUE reserves the
//! amount and waits for clearance.

use async_trait::async_trait;

use crate::ledger::money::{to_decimal, to_f64, MONEY_TOLERANCE};
use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use shared::ledger::{
    AdmissionSnapshot, CarryForwardShift, EventPayload, InstallmentState, InstallmentStatus,
    LedgerEvent, LedgerEventType, PaymentInput, PaymentMethod,
};

/// RecordPayment action
#[derive(Debug, Clone)]
pub struct RecordPaymentAction {
    pub admission_id: String,
    pub installment_number: u32,
    pub payment: PaymentInput,
}

/// Settle a tendered amount against an installment's outstanding balance.
///
/// Returns the resulting status and, when a shortfall is carried forward,
/// the shift onto the next open installment. Cheque clearance settles the
/// reserved amount under this same rule.
pub fn settle_against_outstanding(
    snapshot: &AdmissionSnapshot,
    installment: &InstallmentState,
    tendered: f64,
    carry_forward: bool,
) -> Result<(InstallmentStatus, Option<CarryForwardShift>), LedgerError> {
    let outstanding = to_decimal(installment.amount) - to_decimal(installment.paid_amount);
    let shortfall = outstanding - to_decimal(tendered);

    // Exact settlement of the currently outstanding amount
    if shortfall.abs() < MONEY_TOLERANCE {
        return Ok((InstallmentStatus::Paid, None));
    }

    // Short payment kept on this installment
    if !carry_forward {
        return Ok((InstallmentStatus::Partial, None));
    }

    // Carry-forward: this installment closes and the shortfall moves onto
    // the next unsettled installment
    let target = snapshot
        .next_carry_target(installment.installment_number)
        .ok_or(LedgerError::NoCarryForwardTarget(
            installment.installment_number,
        ))?;

    Ok((
        InstallmentStatus::Paid,
        Some(CarryForwardShift {
            target_installment: target,
            amount: to_f64(shortfall),
        }),
    ))
}

#[async_trait]
impl CommandHandler for RecordPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        // 1. Validate payment input (finite, positive, within bounds)
        crate::ledger::money::validate_payment(&self.payment)?;

        // 2. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.admission_id)?;

        // 3. Locate the target installment
        let installment = snapshot.installment(self.installment_number).ok_or_else(|| {
            LedgerError::InstallmentNotFound(self.admission_id.clone(), self.installment_number)
        })?;

        // 4. Validate installment status - must accept new money
        match installment.status {
            InstallmentStatus::Pending | InstallmentStatus::Partial => {}
            InstallmentStatus::Paid => {
                return Err(LedgerError::AlreadySettled(self.installment_number));
            }
            InstallmentStatus::PendingClearance => {
                return Err(LedgerError::ClearancePending(self.installment_number));
            }
            InstallmentStatus::Overdue | InstallmentStatus::Rejected => {
                return Err(LedgerError::InvalidOperation(format!(
                    "Installment {} stored with display-only status {:?}",
                    self.installment_number, installment.status
                )));
            }
        }

        // 5. Overpayment guard against the currently outstanding amount.
        // Any excess of a full paisa or more is rejected; anything smaller
        // settles, so an accepted tender can never leave paid > amount.
        let outstanding = to_decimal(installment.amount) - to_decimal(installment.paid_amount);
        if to_decimal(self.payment.paid_amount) >= outstanding + MONEY_TOLERANCE {
            return Err(LedgerError::OverpaymentNotAllowed {
                tendered: self.payment.paid_amount,
                outstanding: to_f64(outstanding),
            });
        }

        // 6. Cheque payments reserve the amount until the bank clears it
        if self.payment.payment_method == PaymentMethod::Cheque {
            let cheque = self
                .payment
                .cheque_details()
                .ok_or(LedgerError::MissingChequeDetails)?;

            let seq = ctx.next_sequence();
            let event = LedgerEvent::new(
                seq,
                self.admission_id.clone(),
                metadata.operator_id.clone(),
                metadata.operator_name.clone(),
                metadata.command_id.clone(),
                Some(metadata.timestamp),
                LedgerEventType::ChequeRecorded,
                EventPayload::ChequeRecorded {
                    installment_number: self.installment_number,
                    amount: installment.amount,
                    pending_amount: self.payment.paid_amount,
                    cheque,
                    transaction_id: self.payment.transaction_id.clone(),
                    received_date: self.payment.received_date,
                    carry_forward: self.payment.carry_forward,
                    remarks: self.payment.remarks.clone(),
                },
            );
            return Ok(vec![event]);
        }

        // 7. Immediate settlement: exact, partial, or partial with carry
        let (status, carry) = settle_against_outstanding(
            &snapshot,
            installment,
            self.payment.paid_amount,
            self.payment.carry_forward,
        )?;

        // 8. Allocate sequence number
        let seq = ctx.next_sequence();

        // 9. Create event
        let event = LedgerEvent::new(
            seq,
            self.admission_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            LedgerEventType::PaymentRecorded,
            EventPayload::PaymentRecorded {
                installment_number: self.installment_number,
                amount: installment.amount,
                paid_amount: self.payment.paid_amount,
                payment_method: self.payment.payment_method,
                transaction_id: self.payment.transaction_id.clone(),
                received_date: self.payment.received_date,
                status,
                carry,
                remarks: self.payment.remarks.clone(),
            },
        );

        Ok(vec![event])
    }
}
