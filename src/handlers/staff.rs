use crate::{
    dto::staff::{
        CreateStaffRequest, StaffDetailView, StaffListQuery, StaffView, UpdateStaffRequest,
    },
    entities::staff,
    errors::ServiceError,
    handlers::common::{created_response, message_response, AppJson, AppPath, AppQuery},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    response::{Json, Response},
};
use serde_json::{json, Value};

pub async fn list_staff(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<StaffListQuery>,
) -> ApiResult<Vec<StaffView>> {
    let members = state.staff_service().list_staff(&query).await?;
    Ok(Json(ApiResponse::success(members)))
}

pub async fn get_staff(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<StaffDetailView> {
    let detail = state.staff_service().get_staff(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn create_staff(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateStaffRequest>,
) -> Result<Response, ServiceError> {
    let created = state.staff_service().create_staff(payload).await?;
    Ok(created_response(created))
}

pub async fn update_staff(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateStaffRequest>,
) -> ApiResult<staff::Model> {
    let updated = state.staff_service().update_staff(id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> ApiResult<Value> {
    state.staff_service().delete_staff(id).await?;
    Ok(message_response(json!({ "id": id }), "Staff member deleted"))
}
