//! RegisterAdmission command handler
//!
//! Creates a new admission with its fee structure and installment schedule.

use async_trait::async_trait;
use tracing::info;

use crate::ledger::money::{validate_fee_structure, validate_schedule};
use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use shared::ledger::{
    AdmissionInput, EventPayload, FeeStructure, InstallmentState, InstallmentStatus, LedgerEvent,
    LedgerEventType,
};

/// RegisterAdmission action
#[derive(Debug, Clone)]
pub struct RegisterAdmissionAction {
    pub admission: AdmissionInput,
    /// Server-generated admission ID
    pub admission_id: String,
    /// Server-generated admission number
    pub admission_number: String,
}

/// Build the installment rows for a fresh admission.
///
/// Row 0 is the down payment, due at admission time and therefore without
/// a due date. A zero down payment starts settled so it never blocks the
/// admission from reaching COMPLETED.
pub fn build_installments(
    down_payment: f64,
    schedule: &[shared::ledger::InstallmentScheduleInput],
) -> Vec<InstallmentState> {
    let mut installments = Vec::with_capacity(schedule.len() + 1);

    let mut down = InstallmentState::new(0, None, down_payment);
    if down.amount <= 0.0 {
        down.status = InstallmentStatus::Paid;
    }
    installments.push(down);

    for (idx, entry) in schedule.iter().enumerate() {
        installments.push(InstallmentState::new(
            idx as u32 + 1,
            Some(entry.due_date),
            entry.amount,
        ));
    }

    installments
}

#[async_trait]
impl CommandHandler for RegisterAdmissionAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        info!(
            admission_id = %self.admission_id,
            admission_number = %self.admission_number,
            student_id = %self.admission.student_id,
            "RegisterAdmissionAction::execute starting"
        );

        // 1. Validate fee structure arithmetic
        validate_fee_structure(&self.admission)?;

        // 2. Validate the schedule covers the fees exactly
        validate_schedule(&self.admission)?;

        // 3. Guard against ID collision (server generates IDs, so this
        //    only fires on a retried command that lost its idempotency key)
        if ctx.load_snapshot(&self.admission_id).is_ok() {
            return Err(LedgerError::AdmissionAlreadyExists(
                self.admission_id.clone(),
            ));
        }

        // 4. Allocate sequence number
        let seq = ctx.next_sequence();

        // 5. Create snapshot with server-generated admission_number
        let fee_structure = FeeStructure {
            base_fees: self.admission.base_fees,
            discount_amount: self.admission.discount_amount,
            cgst_amount: self.admission.cgst_amount,
            sgst_amount: self.admission.sgst_amount,
            total_fees: self.admission.total_fees,
            down_payment: self.admission.down_payment,
        };

        let mut snapshot = ctx.create_snapshot(self.admission_id.clone());
        snapshot.admission_number = self.admission_number.clone();
        snapshot.student_id = self.admission.student_id.clone();
        snapshot.student_name = self.admission.student_name.clone();
        snapshot.course = self.admission.course.clone();
        snapshot.fee_structure = fee_structure.clone();
        snapshot.installments =
            build_installments(self.admission.down_payment, &self.admission.installments);
        snapshot.created_at = metadata.timestamp;
        snapshot.updated_at = metadata.timestamp;
        snapshot.last_sequence = seq;

        // 6. Update checksum
        snapshot.update_checksum();

        // 7. Save to context
        ctx.save_snapshot(snapshot);

        // 8. Create event carrying everything replay needs
        let event = LedgerEvent::new(
            seq,
            self.admission_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            LedgerEventType::AdmissionRegistered,
            EventPayload::AdmissionRegistered {
                admission_number: self.admission_number.clone(),
                student_id: self.admission.student_id.clone(),
                student_name: self.admission.student_name.clone(),
                course: self.admission.course.clone(),
                fee_structure,
                schedule: self.admission.installments.clone(),
            },
        );

        info!(
            admission_id = %self.admission_id,
            seq = seq,
            installment_count = self.admission.installments.len() + 1,
            "RegisterAdmissionAction::execute completed"
        );
        Ok(vec![event])
    }
}
