//! ChequeCleared event applier
//!
//! Applies the ChequeCleared event to turn a reserved cheque into settled
//! money.

use crate::ledger::money::{to_decimal, to_f64};
use crate::ledger::traits::EventApplier;
use shared::ledger::{AdmissionSnapshot, EventPayload, LedgerEvent};

/// ChequeCleared applier
pub struct ChequeClearedApplier;

impl EventApplier for ChequeClearedApplier {
    fn apply(&self, snapshot: &mut AdmissionSnapshot, event: &LedgerEvent) {
        if let EventPayload::ChequeCleared {
            installment_number,
            settled_amount,
            status,
            carry,
            ..
        } = &event.payload
        {
            if let Some(installment) = snapshot.installment_mut(*installment_number) {
                // The reservation becomes settled money
                installment.pending_cheque = None;
                installment.paid_amount =
                    to_f64(to_decimal(installment.paid_amount) + to_decimal(*settled_amount));
                installment.status = *status;
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
