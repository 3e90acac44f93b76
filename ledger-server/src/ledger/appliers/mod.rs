//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions.

use enum_dispatch::enum_dispatch;

use shared::ledger::{EventPayload, LedgerEvent};

mod admission_registered;
mod cheque_bounced;
mod cheque_cleared;
mod cheque_recorded;
mod payment_recorded;

pub use admission_registered::AdmissionRegisteredApplier;
pub use cheque_bounced::ChequeBouncedApplier;
pub use cheque_cleared::ChequeClearedApplier;
pub use cheque_recorded::ChequeRecordedApplier;
pub use payment_recorded::PaymentRecordedApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    AdmissionRegistered(AdmissionRegisteredApplier),
    PaymentRecorded(PaymentRecordedApplier),
    ChequeRecorded(ChequeRecordedApplier),
    ChequeCleared(ChequeClearedApplier),
    ChequeBounced(ChequeBouncedApplier),
}

/// Convert LedgerEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload.
impl From<&LedgerEvent> for EventAction {
    fn from(event: &LedgerEvent) -> Self {
        match &event.payload {
            EventPayload::AdmissionRegistered { .. } => {
                EventAction::AdmissionRegistered(AdmissionRegisteredApplier)
            }
            EventPayload::PaymentRecorded { .. } => {
                EventAction::PaymentRecorded(PaymentRecordedApplier)
            }
            EventPayload::ChequeRecorded { .. } => {
                EventAction::ChequeRecorded(ChequeRecordedApplier)
            }
            EventPayload::ChequeCleared { .. } => EventAction::ChequeCleared(ChequeClearedApplier),
            EventPayload::ChequeBounced { .. } => EventAction::ChequeBounced(ChequeBouncedApplier),
        }
    }
}
