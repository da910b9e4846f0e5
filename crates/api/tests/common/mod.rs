#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use jsonwebtoken::{encode, EncodingKey, Header};
use millwright_api::auth::jwt::{Claims, JwtConfig};
use millwright_api::config::ServerConfig;
use millwright_api::router::build_app_router;
use millwright_api::state::AppState;
use millwright_core::marketplace::MarketplacePayload;
use millwright_events::{
    DisabledMarketplace, EmailChannel, EmailError, EmailMessage, MarketplaceClient,
    MarketplaceError,
};

pub const SECRET: &str = "integration-test-secret-that-is-long-enough";

pub const ADMIN: (i64, &str) = (1, "admin");
pub const MANAGER: (i64, &str) = (2, "production_manager");
pub const OPERATOR: (i64, &str) = (3, "operator");
pub const OTHER_OPERATOR: (i64, &str) = (4, "operator");

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Marketplace fake that records every payload and succeeds or fails on demand.
#[derive(Default)]
pub struct FakeMarketplace {
    pub fail: bool,
    pub pushed: Mutex<Vec<MarketplacePayload>>,
}

impl FakeMarketplace {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn pushed(&self) -> Vec<MarketplacePayload> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketplaceClient for FakeMarketplace {
    async fn push_update(&self, payload: &MarketplacePayload) -> Result<(), MarketplaceError> {
        self.pushed.lock().unwrap().push(payload.clone());
        if self.fail {
            Err(MarketplaceError::HttpStatus(503))
        } else {
            Ok(())
        }
    }
}

/// Email fake that records messages.
#[derive(Default)]
pub struct FakeEmail {
    pub fail: bool,
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl FakeEmail {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailChannel for FakeEmail {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::Timeout(10));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults and no integrations.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: SECRET.to_string(),
            leeway_secs: 0,
        },
        marketplace: None,
        email: None,
    }
}

/// Full application router with the production middleware stack, no email
/// channel, and the marketplace disabled.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, None, Arc::new(DisabledMarketplace))
}

/// Full application router with the given delivery channels.
pub fn build_test_app_with(
    pool: PgPool,
    email: Option<Arc<dyn EmailChannel>>,
    marketplace: Arc<dyn MarketplaceClient>,
) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        email,
        marketplace,
    };
    build_app_router(state, &config)
}

/// Bearer token for `(user_id, role)`, signed the way the auth service signs them.
pub fn token(user: (i64, &str)) -> String {
    token_expiring_in(user, 900)
}

pub fn token_expiring_in((user_id, role): (i64, &str), secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: now + secs,
        iat: Some(now),
        jti: Some(uuid::Uuid::new_v4().to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get_public(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: &Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_empty(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json(app: &Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Read the full response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response<Body>, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a feedback record and return its id.
pub async fn create_feedback(app: &Router, production_id: &str, batch_id: Option<&str>) -> i64 {
    let response = post_json(
        app,
        "/api/v1/feedback",
        &token(MANAGER),
        serde_json::json!({
            "production_id": production_id,
            "batch_id": batch_id,
            "product_id": "SKU-100",
            "product_name": "Steel bracket",
            "quantity_ordered": 100,
            "customer_notes": "Deliver to dock 4",
        }),
    )
    .await;
    let json = expect_json(response, StatusCode::CREATED).await;
    json["data"]["id"].as_i64().unwrap()
}

/// Create a step and return the full mutation response body.
pub async fn create_step(app: &Router, feedback_id: i64, index: i32, status: &str) -> Value {
    let response = post_json(
        app,
        &format!("/api/v1/feedback/{feedback_id}/steps"),
        &token(OPERATOR),
        serde_json::json!({
            "step_index": index,
            "name": format!("Step {index}"),
            "status": status,
            "quantity_passed": 10,
            "quantity_rejected": 1,
        }),
    )
    .await;
    expect_json(response, StatusCode::CREATED).await
}
