//! PaymentRecorded event applier
//!
//! Applies the PaymentRecorded event to settle money on an installment.

use crate::ledger::money::{to_decimal, to_f64};
use crate::ledger::traits::EventApplier;
use shared::ledger::{AdmissionSnapshot, EventPayload, LedgerEvent};

/// PaymentRecorded applier
pub struct PaymentRecordedApplier;

impl EventApplier for PaymentRecordedApplier {
    fn apply(&self, snapshot: &mut AdmissionSnapshot, event: &LedgerEvent) {
        if let EventPayload::PaymentRecorded {
            installment_number,
            paid_amount,
            payment_method,
            status,
            carry,
            ..
        } = &event.payload
        {
            if let Some(installment) = snapshot.installment_mut(*installment_number) {
                // Settle the tendered money using Decimal for precision
                installment.paid_amount =
                    to_f64(to_decimal(installment.paid_amount) + to_decimal(*paid_amount));
                installment.status = *status;
                installment.payment_method = Some(*payment_method);
                installment.cheque = None;
            }

            // Carry-forward moves the shortfall between installments; the
            // schedule total never changes
            if let Some(shift) = carry {
                if let Some(source) = snapshot.installment_mut(*installment_number) {
                    source.amount = to_f64(to_decimal(source.amount) - to_decimal(shift.amount));
                }
                if let Some(target) = snapshot.installment_mut(shift.target_installment) {
                    target.amount = to_f64(to_decimal(target.amount) + to_decimal(shift.amount));
                }
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
