//! Extractors and response helpers shared by the farm handlers.
//!
//! The `App*` extractors reject through [`ServiceError`], so a malformed body,
//! path or query string gets the same error envelope as a failed validation.

use crate::{errors::ServiceError, ApiResponse};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// JSON body extractor rejecting with a 400 `ServiceError`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

/// Query string extractor rejecting with a 400 `ServiceError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct AppQuery<T>(pub T);

/// Path extractor rejecting with a 400 `ServiceError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServiceError))]
pub struct AppPath<T>(pub T);

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Success envelope with a message and no payload body beyond `data`.
pub fn message_response<T: Serialize>(data: T, message: &str) -> Json<ApiResponse<T>> {
    let mut response = ApiResponse::success(data);
    response.message = Some(message.to_string());
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::post, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn echo(AppJson(value): AppJson<serde_json::Value>) -> Json<serde_json::Value> {
        Json(value)
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request_envelope() {
        let app = Router::new().route("/", post(echo));
        let response = app
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["error"], "Bad Request");
        assert!(payload["timestamp"].is_string());
    }

    #[test]
    fn created_response_uses_201() {
        let response = created_response(serde_json::json!({"id": 1}));
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
