//! ChequeBounced event applier
//!
//! Applies the ChequeBounced event to drop the reservation and reopen the
//! installment. Paid money and the owed amount are unchanged; the bounced
//! cheque was never counted as collected.

use crate::ledger::traits::EventApplier;
use shared::ledger::{AdmissionSnapshot, EventPayload, LedgerEvent};

/// ChequeBounced applier
pub struct ChequeBouncedApplier;

impl EventApplier for ChequeBouncedApplier {
    fn apply(&self, snapshot: &mut AdmissionSnapshot, event: &LedgerEvent) {
        if let EventPayload::ChequeBounced {
            installment_number,
            reopened_status,
            ..
        } = &event.payload
        {
            if let Some(installment) = snapshot.installment_mut(*installment_number) {
                // Drop the reservation and restore the pre-cheque method
                if let Some(pending) = installment.pending_cheque.take() {
                    installment.payment_method = pending.prior_method;
                    installment.cheque = pending.prior_cheque;
                }
                installment.status = *reopened_status;
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
