#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use farmstead_api::{build_router, config::AppConfig, db, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_SECRET: &str =
    "k9Qw2Zr7Lp4Xv8Nt3Bm6Hd1Sy5Fc0Ga-integration-secret-with-plenty-of-entropy";

/// Application under test, backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        // A single connection keeps the in-memory database alive across requests.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone());

        Self { router, state }
    }

    /// Registers a fresh account and returns its bearer token.
    pub async fn register_and_login(&self, email: &str) -> String {
        let password = "correct-horse-battery";
        let response = self
            .request(
                Method::POST,
                "/auth/register",
                Some(json!({ "name": "Farm Manager", "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), 201, "registration should succeed");

        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), 200, "login should succeed");
        let body = response_json(response).await;
        body["data"]["accessToken"]
            .as_str()
            .expect("access token in login response")
            .to_string()
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut headers = Vec::new();
        if let Some(tok) = token {
            headers.push((header::AUTHORIZATION.as_str(), format!("Bearer {}", tok)));
        }
        self.request_with_headers(method, uri, body, &headers).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, String)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Harness preloaded with a logged-in manager.
pub struct AuthedApp {
    pub app: TestApp,
    pub token: String,
}

impl AuthedApp {
    pub async fn new() -> Self {
        let app = TestApp::new().await;
        let token = app.register_and_login("manager@farm.test").await;
        Self { app, token }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.app.request(method, uri, body, Some(&self.token)).await
    }

    /// Sends the request and returns `(status, json body)`.
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (u16, Value) {
        let response = self.send(method, uri, body).await;
        let status = response.status().as_u16();
        (status, response_json(response).await)
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}
