use crate::{services::reports::FarmSummary, ApiResponse, ApiResult, AppState};
use axum::{extract::State, response::Json};

/// Ledger, herd and payroll figures in one payload
pub async fn farm_summary(State(state): State<AppState>) -> ApiResult<FarmSummary> {
    let summary = state.report_service().farm_summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}
