//! AdmissionRegistered event applier
//!
//! Applies the AdmissionRegistered event to seed the initial snapshot state.

use crate::ledger::actions::register_admission::build_installments;
use crate::ledger::traits::EventApplier;
use shared::ledger::{AdmissionSnapshot, EventPayload, LedgerEvent};

/// AdmissionRegistered applier
pub struct AdmissionRegisteredApplier;

impl EventApplier for AdmissionRegisteredApplier {
    fn apply(&self, snapshot: &mut AdmissionSnapshot, event: &LedgerEvent) {
        if let EventPayload::AdmissionRegistered {
            admission_number,
            student_id,
            student_name,
            course,
            fee_structure,
            schedule,
        } = &event.payload
        {
            // Set admission_id from event (important for replay scenarios)
            snapshot.admission_id = event.admission_id.clone();
            snapshot.admission_number = admission_number.clone();
            snapshot.student_id = student_id.clone();
            snapshot.student_name = student_name.clone();
            snapshot.course = course.clone();
            snapshot.fee_structure = fee_structure.clone();
            snapshot.installments = build_installments(fee_structure.down_payment, schedule);
            snapshot.created_at = event.timestamp;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;
            snapshot.version += 1;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
