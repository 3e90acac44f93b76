use super::types::{AdmissionInput, ClearanceDecision, PaymentInput};
use serde::{Deserialize, Serialize};

/// Ledger command - a request to change admission state
///
/// Commands are validated before producing events. The same command_id is
/// never applied twice (idempotency), and a command carrying an
/// `expected_version` is rejected when the admission has moved past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerCommand {
    /// Unique command ID (UUID v4), used for idempotency
    pub command_id: String,
    /// Operator submitting the command
    pub operator_id: String,
    /// Operator name (snapshot for audit)
    pub operator_name: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Optimistic concurrency token: the admission version the caller read
    ///
    /// `None` skips the check. When set and the stored snapshot's version
    /// differs, the command fails with CONCURRENT_MODIFICATION and applies
    /// nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    /// Command payload
    pub payload: LedgerCommandPayload,
}

/// Command payload - one variant per ledger operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerCommandPayload {
    /// Register a new admission with its fee structure and schedule
    RegisterAdmission { admission: AdmissionInput },

    /// Record a payment against one installment
    RecordPayment {
        admission_id: String,
        installment_number: u32,
        payment: PaymentInput,
    },

    /// Resolve a pending cheque (approve or reject)
    ResolveClearance {
        admission_id: String,
        installment_number: u32,
        decision: ClearanceDecision,
        #[serde(skip_serializing_if = "Option::is_none")]
        remark: Option<String>,
    },
}

impl LedgerCommandPayload {
    /// Admission the command targets (None for RegisterAdmission, which
    /// creates the aggregate and gets its ID assigned by the server)
    pub fn admission_id(&self) -> Option<&str> {
        match self {
            LedgerCommandPayload::RegisterAdmission { .. } => None,
            LedgerCommandPayload::RecordPayment { admission_id, .. } => Some(admission_id),
            LedgerCommandPayload::ResolveClearance { admission_id, .. } => Some(admission_id),
        }
    }
}

impl LedgerCommand {
    /// Create a new command with generated ID and current timestamp
    pub fn new(operator_id: String, operator_name: String, payload: LedgerCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            operator_id,
            operator_name,
            timestamp: chrono::Utc::now().timestamp_millis(),
            expected_version: None,
            payload,
        }
    }

    /// Attach an optimistic concurrency token
    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}
