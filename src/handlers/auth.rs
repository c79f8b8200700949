use crate::{
    auth::{
        user, AuthError, AuthRouterExt, AuthUser, LoginCredentials, PasswordChange,
        ProfileUpdate, RegisterRequest, TokenPair,
    },
    handlers::common::{created_response, message_response, AppJson},
    ApiResponse, AppState,
};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: user::Model,
    #[serde(flatten)]
    pub token: TokenPair,
}

/// `/auth` routes. Registration and login are open; the rest need a token.
pub fn auth_routes() -> Router<AppState> {
    let open = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
        .with_auth();

    open.merge(protected)
}

pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Response, AuthError> {
    let account = state.auth.register(payload).await?;
    Ok(created_response(account))
}

/// Issues a token in the body and as an HttpOnly session cookie
pub async fn login(
    State(state): State<AppState>,
    AppJson(credentials): AppJson<LoginCredentials>,
) -> Result<Response, AuthError> {
    let (account, token) = state.auth.login(credentials).await?;
    let cookie = state.auth.session_cookie(&token.access_token);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(LoginResponse {
            user: account,
            token,
        })),
    )
        .into_response())
}

/// Revokes the presented token and clears the session cookie
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let token = state
        .auth
        .token_from_headers(&headers)
        .ok_or(AuthError::MissingAuth)?;
    state.auth.revoke_token(&token).await?;
    info!(user_id = auth_user.user_id, "User logged out");

    Ok((
        [(header::SET_COOKIE, state.auth.clear_cookie())],
        message_response(json!({ "loggedOut": true }), "Successfully logged out"),
    )
        .into_response())
}

pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<user::Model>>, AuthError> {
    let account = state.auth.current_user(&auth_user).await?;
    Ok(Json(ApiResponse::success(account)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<ApiResponse<user::Model>>, AuthError> {
    let account = state.auth.update_profile(&auth_user, update).await?;
    Ok(Json(ApiResponse::success(account)))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    AppJson(change): AppJson<PasswordChange>,
) -> Result<Json<ApiResponse<Value>>, AuthError> {
    state.auth.change_password(&auth_user, change).await?;
    Ok(message_response(json!({ "updated": true }), "Password changed"))
}
