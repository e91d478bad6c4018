#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use gridwatch::api::{self, AppState};
use gridwatch::config::{Config, SecurityConfig};
use gridwatch::state::SharedState;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN: (&str, &str) = ("admin", "password");
pub const STANDARD: (&str, &str) = ("standard_user", "standardpass");
pub const TECHNICIAN: (&str, &str) = ("technician_user", "techpass");

/// Ids assigned by the demo dataset on a fresh database.
pub const SITE_A: i32 = 1;
pub const SITE_B: i32 = 2;
pub const DEVICE_1: i32 = 1;
pub const DEVICE_2: i32 = 2;
pub const METRIC_1: i32 = 1;
pub const METRIC_2: i32 = 2;
pub const SUBSCRIPTION_1: i32 = 1;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.auth.secret_key = "integration-test-secret-key".to_string();
    config.security = SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        min_password_length: 6,
    };
    config
}

/// Empty database with only the bootstrap admin.
pub async fn spawn_app() -> TestApp {
    let shared = SharedState::new(test_config())
        .await
        .expect("Failed to create shared state");
    let state = api::create_app_state(Arc::new(shared), None);

    TestApp {
        router: api::router(state.clone()),
        state,
    }
}

/// Bootstrap admin plus the demo users, sites, devices, metrics and
/// subscription.
pub async fn spawn_seeded_app() -> TestApp {
    let app = spawn_app().await;
    let seeded = gridwatch::cli::seed_demo_data(app.state.store(), app.state.config())
        .await
        .expect("Failed to seed demo data");
    assert!(seeded);
    app
}

impl TestApp {
    pub async fn login(&self, (username, password): (&str, &str)) -> String {
        let (status, body) = self.login_raw(username, password).await;
        assert_eq!(status, StatusCode::OK, "login failed for {username}: {body}");
        body["access_token"]
            .as_str()
            .expect("access_token missing")
            .to_string()
    }

    pub async fn login_raw(&self, username: &str, password: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap();

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, body)
    }
}
