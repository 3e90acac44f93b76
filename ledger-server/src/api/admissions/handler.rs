//! Admission API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use crate::api::{manager_error, run_blocking};
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};
use shared::error::ErrorCode;
use shared::ledger::{
    AdmissionInput, AdmissionSnapshot, AdmissionSummary, ClearanceDecision, CommandErrorCode,
    CommandResponse, LedgerCommand, LedgerCommandPayload, LedgerEvent, PaymentHistoryEntry,
    PaymentInput,
};

/// Retry attempts when the server attaches the concurrency token itself
const CAS_RETRIES: u32 = 3;

// ========== Request / Response Types ==========

/// Registration request: the admission input plus an optional client
/// command ID for idempotent retries
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub admission: AdmissionInput,
    #[serde(default)]
    pub command_id: Option<String>,
}

/// Payment request against one installment
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    #[serde(flatten)]
    pub payment: PaymentInput,
    /// Version the client read; when present the command is attempted
    /// exactly once and a mismatch surfaces as 409
    #[serde(default)]
    pub expected_version: Option<u64>,
    #[serde(default)]
    pub command_id: Option<String>,
}

/// Cheque clearance request
#[derive(Debug, Deserialize)]
pub struct ClearanceRequest {
    pub decision: ClearanceDecision,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub expected_version: Option<u64>,
    #[serde(default)]
    pub command_id: Option<String>,
}

/// Command receipt: the post-command snapshot and the history entry the
/// command produced
#[derive(Debug, Serialize)]
pub struct CommandReceipt {
    pub command_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission_id: Option<String>,
    /// Absent only when the command was a replayed duplicate with no
    /// resolvable target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<AdmissionSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<PaymentHistoryEntry>,
}

// ========== Helpers ==========

/// Operator identity from request headers, defaulting to the system
/// operator for unattended callers
fn operator(headers: &HeaderMap) -> (String, String) {
    let id = headers
        .get("x-operator-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("system")
        .to_string();
    let name = headers
        .get("x-operator-name")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("System")
        .to_string();
    (id, name)
}

async fn execute(
    state: &ServerState,
    cmd: LedgerCommand,
) -> AppResult<(CommandResponse, Vec<LedgerEvent>)> {
    let manager = state.manager.clone();
    run_blocking(move || manager.execute_command_with_events(cmd)).await
}

fn into_result(
    response: CommandResponse,
    events: Vec<LedgerEvent>,
) -> AppResult<(CommandResponse, Vec<LedgerEvent>)> {
    match response.error {
        Some(err) => Err(AppError::with_message(err.code.into(), err.message)),
        None => Ok((response, events)),
    }
}

/// Submit a mutation command.
///
/// A client-supplied `expected_version` travels verbatim and gets exactly
/// one attempt. Without one the server attaches the current version itself
/// and retries a few times if another operator slips in between the read
/// and the write.
async fn submit(
    state: &ServerState,
    mut cmd: LedgerCommand,
) -> AppResult<(CommandResponse, Vec<LedgerEvent>)> {
    if cmd.expected_version.is_some() {
        let (response, events) = execute(state, cmd).await?;
        return into_result(response, events);
    }

    let target = cmd.payload.admission_id().map(str::to_string);
    let mut attempt = 0;
    loop {
        if let Some(id) = &target {
            let manager = state.manager.clone();
            let lookup = id.clone();
            let snapshot = run_blocking(move || manager.get_snapshot(&lookup))
                .await?
                .map_err(manager_error)?;
            // Missing admission: leave the token off and let the command
            // itself report ADMISSION_NOT_FOUND
            cmd.expected_version = snapshot.map(|s| s.version);
        }

        let (response, events) = execute(state, cmd.clone()).await?;
        let conflicted = matches!(
            &response.error,
            Some(err) if err.code == CommandErrorCode::ConcurrentModification
        );
        attempt += 1;
        if conflicted && attempt < CAS_RETRIES {
            tracing::debug!(
                command_id = %cmd.command_id,
                attempt,
                "Version conflict on server-attached token, retrying"
            );
            continue;
        }
        return into_result(response, events);
    }
}

/// Assemble the receipt for a successful command
async fn receipt(
    state: &ServerState,
    target: Option<String>,
    response: CommandResponse,
    events: Vec<LedgerEvent>,
) -> AppResult<CommandReceipt> {
    let admission_id = response
        .admission_id
        .clone()
        .or_else(|| events.first().map(|e| e.admission_id.clone()))
        .or(target);

    let snapshot = match &admission_id {
        Some(id) => {
            let manager = state.manager.clone();
            let lookup = id.clone();
            run_blocking(move || manager.get_snapshot(&lookup))
                .await?
                .map_err(manager_error)?
        }
        None => None,
    };

    let entry = events.last().and_then(PaymentHistoryEntry::from_event);

    Ok(CommandReceipt {
        command_id: response.command_id,
        admission_id,
        snapshot,
        entry,
    })
}

// ========== Command Handlers ==========

/// Register a new admission
pub async fn register(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<CommandReceipt>> {
    let (operator_id, operator_name) = operator(&headers);
    let mut cmd = LedgerCommand::new(
        operator_id,
        operator_name,
        LedgerCommandPayload::RegisterAdmission {
            admission: req.admission,
        },
    );
    if let Some(command_id) = req.command_id {
        cmd.command_id = command_id;
    }

    let (response, events) = submit(&state, cmd).await?;
    Ok(Json(receipt(&state, None, response, events).await?))
}

/// Record a payment against one installment
pub async fn record_payment(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path((id, number)): Path<(String, u32)>,
    Json(req): Json<PaymentRequest>,
) -> AppResult<Json<CommandReceipt>> {
    let (operator_id, operator_name) = operator(&headers);
    let mut cmd = LedgerCommand::new(
        operator_id,
        operator_name,
        LedgerCommandPayload::RecordPayment {
            admission_id: id.clone(),
            installment_number: number,
            payment: req.payment,
        },
    );
    if let Some(command_id) = req.command_id {
        cmd.command_id = command_id;
    }
    if let Some(version) = req.expected_version {
        cmd = cmd.with_expected_version(version);
    }

    let (response, events) = submit(&state, cmd).await?;
    Ok(Json(receipt(&state, Some(id), response, events).await?))
}

/// Approve or reject a pending cheque
pub async fn resolve_clearance(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path((id, number)): Path<(String, u32)>,
    Json(req): Json<ClearanceRequest>,
) -> AppResult<Json<CommandReceipt>> {
    let (operator_id, operator_name) = operator(&headers);
    let mut cmd = LedgerCommand::new(
        operator_id,
        operator_name,
        LedgerCommandPayload::ResolveClearance {
            admission_id: id.clone(),
            installment_number: number,
            decision: req.decision,
            remark: req.remark,
        },
    );
    if let Some(command_id) = req.command_id {
        cmd.command_id = command_id;
    }
    if let Some(version) = req.expected_version {
        cmd = cmd.with_expected_version(version);
    }

    let (response, events) = submit(&state, cmd).await?;
    Ok(Json(receipt(&state, Some(id), response, events).await?))
}

// ========== Query Handlers ==========

/// Current snapshot of one admission
pub async fn get_snapshot(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AdmissionSnapshot>> {
    let manager = state.manager.clone();
    let lookup = id.clone();
    let snapshot = run_blocking(move || manager.get_snapshot(&lookup))
        .await?
        .map_err(manager_error)?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::AdmissionNotFound,
                format!("Admission not found: {}", id),
            )
        })?;
    Ok(Json(snapshot))
}

/// Admission roll-up with OVERDUE derived against the institute calendar
pub async fn get_summary(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AdmissionSummary>> {
    let manager = state.manager.clone();
    let lookup = id.clone();
    let summary = run_blocking(move || manager.get_admission_summary(&lookup))
        .await?
        .map_err(manager_error)?
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::AdmissionNotFound,
                format!("Admission not found: {}", id),
            )
        })?;
    Ok(Json(summary))
}

/// Payment audit trail in event order
pub async fn get_history(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<PaymentHistoryEntry>>> {
    let manager = state.manager.clone();
    let history = run_blocking(move || manager.get_payment_history(&id))
        .await?
        .map_err(manager_error)?;
    Ok(Json(history))
}
