use crate::{
    dto::cattle::{
        CattleDeletion, CattleDetailView, CattleListQuery, CattleView, CreateCattleRequest,
        UpdateCattleRequest,
    },
    entities::cattle,
    handlers::common::{created_response, message_response, AppJson, AppPath, AppQuery},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    response::{Json, Response},
};

/// List cattle with their ledger entry counts
pub async fn list_cattle(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CattleListQuery>,
) -> ApiResult<Vec<CattleView>> {
    let herd = state.cattle_service().list_cattle(&query).await?;
    Ok(Json(ApiResponse::success(herd)))
}

/// Get one animal with its ledger entries
pub async fn get_cattle(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<CattleDetailView> {
    let detail = state.cattle_service().get_cattle(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn create_cattle(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCattleRequest>,
) -> Result<Response, crate::errors::ServiceError> {
    let created = state.cattle_service().create_cattle(payload).await?;
    Ok(created_response(created))
}

pub async fn update_cattle(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateCattleRequest>,
) -> ApiResult<cattle::Model> {
    let updated = state.cattle_service().update_cattle(id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Delete an animal; referenced animals are soft deleted
pub async fn delete_cattle(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<CattleDeletion> {
    let outcome = state.cattle_service().delete_cattle(id).await?;
    let message = if outcome.soft_deleted {
        "Cattle marked as deleted; ledger entries still reference it"
    } else {
        "Cattle deleted"
    };
    Ok(message_response(outcome, message))
}
