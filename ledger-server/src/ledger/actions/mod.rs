//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use crate::ledger::traits::{CommandContext, CommandHandler, CommandMetadata, LedgerError};
use shared::ledger::{LedgerCommand, LedgerCommandPayload, LedgerEvent};

pub mod record_payment;
pub mod register_admission;
mod resolve_clearance;

pub use record_payment::RecordPaymentAction;
pub use register_admission::RegisterAdmissionAction;
pub use resolve_clearance::ResolveClearanceAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    RegisterAdmission(RegisterAdmissionAction),
    RecordPayment(RecordPaymentAction),
    ResolveClearance(ResolveClearanceAction),
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        match self {
            CommandAction::RegisterAdmission(action) => action.execute(ctx, metadata).await,
            CommandAction::RecordPayment(action) => action.execute(ctx, metadata).await,
            CommandAction::ResolveClearance(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert LedgerCommand to CommandAction
///
/// This is the ONLY place with a match on LedgerCommandPayload.
impl From<&LedgerCommand> for CommandAction {
    fn from(cmd: &LedgerCommand) -> Self {
        match &cmd.payload {
            LedgerCommandPayload::RegisterAdmission { .. } => {
                // RegisterAdmission is handled specially in LedgerManager to
                // generate admission_id and admission_number
                // This path should never be reached
                unreachable!(
                    "RegisterAdmission should be handled by LedgerManager, not From<&LedgerCommand>"
                )
            }
            LedgerCommandPayload::RecordPayment {
                admission_id,
                installment_number,
                payment,
            } => CommandAction::RecordPayment(RecordPaymentAction {
                admission_id: admission_id.clone(),
                installment_number: *installment_number,
                payment: payment.clone(),
            }),
            LedgerCommandPayload::ResolveClearance {
                admission_id,
                installment_number,
                decision,
                remark,
            } => CommandAction::ResolveClearance(ResolveClearanceAction {
                admission_id: admission_id.clone(),
                installment_number: *installment_number,
                decision: *decision,
                remark: remark.clone(),
            }),
        }
    }
}
