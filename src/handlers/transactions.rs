use crate::{
    dto::transaction::{SummaryQuery, TransactionListQuery, TransactionRequest, TransactionView},
    errors::ServiceError,
    handlers::common::{created_response, message_response, AppJson, AppPath, AppQuery},
    services::reports::LedgerSummary,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    response::{Json, Response},
};
use serde_json::{json, Value};

/// List ledger entries, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TransactionListQuery>,
) -> ApiResult<Vec<TransactionView>> {
    let entries = state.ledger_service().list_transactions(&query).await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<TransactionView> {
    let entry = state.ledger_service().get_transaction(id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

/// Record a ledger entry together with its cattle side effects
pub async fn create_transaction(
    State(state): State<AppState>,
    AppJson(payload): AppJson<TransactionRequest>,
) -> Result<Response, ServiceError> {
    let entry = state.ledger_service().create_transaction(payload).await?;
    Ok(created_response(entry))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<TransactionRequest>,
) -> ApiResult<TransactionView> {
    let entry = state.ledger_service().update_transaction(id, payload).await?;
    Ok(Json(ApiResponse::success(entry)))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Value> {
    state.ledger_service().delete_transaction(id).await?;
    Ok(message_response(json!({ "id": id }), "Transaction deleted"))
}

/// Income, expense and per-category totals over an optional date range
pub async fn ledger_summary(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SummaryQuery>,
) -> ApiResult<LedgerSummary> {
    let summary = state.report_service().ledger_summary(&query).await?;
    Ok(Json(ApiResponse::success(summary)))
}
