//! Student API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::{manager_error, run_blocking};
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::ledger::StudentFinancialSummary;

/// Totals across every admission of one student
///
/// A student with no admissions gets an all-zero summary rather than 404;
/// the roll-up is defined over whatever admissions exist.
pub async fn get_summary(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<StudentFinancialSummary>> {
    let manager = state.manager.clone();
    let summary = run_blocking(move || manager.get_student_summary(&id))
        .await?
        .map_err(manager_error)?;
    Ok(Json(summary))
}
