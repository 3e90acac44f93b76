use super::snapshot::InstallmentStatus;
use super::types::{ChequeDetails, InstallmentScheduleInput, PaymentMethod};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ledger event - the source of truth for all admission state changes
///
/// Events are immutable once created. The admission snapshot is derived by
/// applying events in sequence order. Every payment-bearing event doubles as
/// the backing record for one `PaymentHistoryEntry` in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Unique event ID (UUID v4)
    pub event_id: String,
    /// Global sequence number assigned by the server
    ///
    /// This is the AUTHORITATIVE ordering mechanism for state evolution
    pub sequence: u64,
    /// Admission this event belongs to
    pub admission_id: String,
    /// Server timestamp (Unix milliseconds) - AUTHORITATIVE for state evolution
    /// Always set by server when event is created
    pub timestamp: i64,
    /// Client timestamp (Unix milliseconds) - for audit and debugging
    /// Preserved from original command, may differ from server time due to clock skew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Operator who triggered this event
    pub operator_id: String,
    /// Operator name (snapshot for audit)
    pub operator_name: String,
    /// Command that triggered this event (for audit tracing)
    pub command_id: String,
    /// Event type
    pub event_type: LedgerEventType,
    /// Event payload
    pub payload: EventPayload,
}

/// Event types for the admission payment ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEventType {
    /// Admission registered with fee structure and installment schedule
    AdmissionRegistered,
    /// Immediate-settlement payment applied to an installment
    PaymentRecorded,
    /// Cheque received, amount reserved pending clearance
    ChequeRecorded,
    /// Cheque cleared, reserved amount settled
    ChequeCleared,
    /// Cheque bounced, installment reopened
    ChequeBounced,
}

impl std::fmt::Display for LedgerEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LedgerEventType::AdmissionRegistered => "ADMISSION_REGISTERED",
            LedgerEventType::PaymentRecorded => "PAYMENT_RECORDED",
            LedgerEventType::ChequeRecorded => "CHEQUE_RECORDED",
            LedgerEventType::ChequeCleared => "CHEQUE_CLEARED",
            LedgerEventType::ChequeBounced => "CHEQUE_BOUNCED",
        };
        write!(f, "{}", s)
    }
}

/// Shortfall moved onto a later installment by a carry-forward payment
///
/// The source installment's amount is reduced by `amount` and the target
/// installment's amount grows by the same value, so the schedule total
/// never changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarryForwardShift {
    /// Installment number that absorbs the shortfall
    pub target_installment: u32,
    /// Amount moved off the paying installment
    pub amount: f64,
}

/// Event payload - data specific to each event type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    /// Admission registered - seeds the snapshot
    AdmissionRegistered {
        admission_number: String,
        student_id: String,
        student_name: String,
        course: String,
        fee_structure: super::snapshot::FeeStructure,
        /// Installment schedule (1-based; the down payment entry is derived
        /// from the fee structure, not listed here)
        schedule: Vec<InstallmentScheduleInput>,
    },

    /// Immediate-settlement payment applied (CASH, UPI, CARD, BANK_TRANSFER)
    PaymentRecorded {
        installment_number: u32,
        /// Installment amount owed when the payment arrived
        amount: f64,
        /// Amount tendered in this event
        paid_amount: f64,
        payment_method: PaymentMethod,
        #[serde(skip_serializing_if = "Option::is_none")]
        transaction_id: Option<String>,
        received_date: NaiveDate,
        /// Status this payment produced on the installment
        status: InstallmentStatus,
        /// Present when a shortfall was carried onto a later installment
        #[serde(skip_serializing_if = "Option::is_none")]
        carry: Option<CarryForwardShift>,
        #[serde(skip_serializing_if = "Option::is_none")]
        remarks: Option<String>,
    },

    /// Cheque received - reserved, not yet counted as paid money
    ChequeRecorded {
        installment_number: u32,
        /// Installment amount owed when the cheque arrived
        amount: f64,
        /// Tendered amount held in reserve until clearance
        pending_amount: f64,
        cheque: ChequeDetails,
        #[serde(skip_serializing_if = "Option::is_none")]
        transaction_id: Option<String>,
        received_date: NaiveDate,
        /// Carry preference captured at record time, applied at clearance
        carry_forward: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        remarks: Option<String>,
    },

    /// Cheque cleared - reserved amount settled into paid_amount
    ChequeCleared {
        installment_number: u32,
        /// Installment amount owed at clearance time
        amount: f64,
        /// Reserved amount now settled
        settled_amount: f64,
        /// Date the cheque was originally received
        received_date: NaiveDate,
        /// Status the settlement produced on the installment
        status: InstallmentStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        carry: Option<CarryForwardShift>,
        #[serde(skip_serializing_if = "Option::is_none")]
        remark: Option<String>,
    },

    /// Cheque bounced - reservation dropped, installment payable again
    ChequeBounced {
        installment_number: u32,
        /// Installment amount owed (unchanged by the bounce)
        amount: f64,
        /// Reserved amount that never became paid money
        pending_amount: f64,
        /// Date the cheque was originally received
        received_date: NaiveDate,
        /// Status the installment reopens to (PENDING or PARTIAL)
        reopened_status: InstallmentStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        remark: Option<String>,
    },
}

impl LedgerEvent {
    /// Create a new event with server-generated ID and timestamp
    ///
    /// # Arguments
    /// * `sequence` - Global sequence number (authoritative ordering)
    /// * `admission_id` - Admission this event belongs to
    /// * `operator_id` - Operator who triggered this event
    /// * `operator_name` - Operator name (snapshot for audit)
    /// * `command_id` - Command that triggered this event
    /// * `client_timestamp` - Client-provided timestamp (for audit, may have clock skew)
    /// * `event_type` - Event type
    /// * `payload` - Event payload
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        admission_id: String,
        operator_id: String,
        operator_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: LedgerEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            admission_id,
            // Server timestamp is ALWAYS set by server - this is authoritative
            timestamp: chrono::Utc::now().timestamp_millis(),
            // Client timestamp preserved for audit (may differ due to clock skew)
            client_timestamp,
            operator_id,
            operator_name,
            command_id,
            event_type,
            payload,
        }
    }

    /// Create event from command (extracts metadata including client timestamp)
    pub fn from_command(
        sequence: u64,
        admission_id: String,
        command: &super::LedgerCommand,
        event_type: LedgerEventType,
        payload: EventPayload,
    ) -> Self {
        Self::new(
            sequence,
            admission_id,
            command.operator_id.clone(),
            command.operator_name.clone(),
            command.command_id.clone(),
            Some(command.timestamp), // Preserve client timestamp
            event_type,
            payload,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_display() {
        assert_eq!(
            LedgerEventType::AdmissionRegistered.to_string(),
            "ADMISSION_REGISTERED"
        );
        assert_eq!(
            LedgerEventType::PaymentRecorded.to_string(),
            "PAYMENT_RECORDED"
        );
        assert_eq!(LedgerEventType::ChequeRecorded.to_string(), "CHEQUE_RECORDED");
        assert_eq!(LedgerEventType::ChequeCleared.to_string(), "CHEQUE_CLEARED");
        assert_eq!(LedgerEventType::ChequeBounced.to_string(), "CHEQUE_BOUNCED");
    }

    #[test]
    fn test_payload_serialization_tag() {
        let payload = EventPayload::PaymentRecorded {
            installment_number: 2,
            amount: 10000.0,
            paid_amount: 10000.0,
            payment_method: PaymentMethod::Cash,
            transaction_id: None,
            received_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            status: InstallmentStatus::Paid,
            carry: None,
            remarks: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "PAYMENT_RECORDED");
        assert_eq!(json["payment_method"], "CASH");
        assert_eq!(json["status"], "PAID");
        // Absent options are omitted entirely
        assert!(json.get("transaction_id").is_none());
        assert!(json.get("carry").is_none());
    }

    #[test]
    fn test_event_roundtrip() {
        let event = LedgerEvent::new(
            7,
            "adm-1".to_string(),
            "op-1".to_string(),
            "Accounts Desk".to_string(),
            "cmd-1".to_string(),
            Some(1736500000000),
            LedgerEventType::ChequeRecorded,
            EventPayload::ChequeRecorded {
                installment_number: 1,
                amount: 6000.0,
                pending_amount: 6000.0,
                cheque: ChequeDetails {
                    cheque_number: "CHQ123".to_string(),
                    cheque_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                    bank_name: "HDFC".to_string(),
                },
                transaction_id: None,
                received_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
                carry_forward: false,
                remarks: None,
            },
        );

        let json = serde_json::to_string(&event).unwrap();
        let decoded: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.sequence, 7);
        assert_eq!(decoded.admission_id, "adm-1");
        assert_eq!(decoded.event_type, LedgerEventType::ChequeRecorded);
        assert!(!decoded.event_id.is_empty());
        assert!(decoded.timestamp > 0);
    }
}
