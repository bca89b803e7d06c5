//! Shared helpers for the API integration tests.
//!
//! Every test runs the production router over the in-memory stores, with a
//! [`ManualClock`] for token expiry and a mailer that hands messages back to
//! the test.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;

use forum_api::config::ServerConfig;
use forum_api::mailer::{Mail, MailError, Mailer};
use forum_api::router::build_app_router;
use forum_api::state::AppState;
use forum_core::clock::ManualClock;
use forum_core::permissions::FORUMS_WRITE;
use forum_core::rate_limit::RateLimitConfig;
use forum_db::Stores;

pub const PASSWORD: &str = "pa55word-long-enough";

/// Build a test `ServerConfig` with the rate limiter switched off.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "testing".to_string(),
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        db_idle_timeout_secs: 60,
        db_query_timeout_secs: 3,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        trust_proxy_headers: false,
        token_cleanup_interval_secs: 3600,
    }
}

/// Mailer that forwards every message to the test over a channel.
pub struct RecordingMailer(mpsc::UnboundedSender<Mail>);

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: Mail) -> Result<(), MailError> {
        self.0
            .send(mail)
            .map_err(|e| MailError(format!("test receiver dropped: {e}")))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    mail: Mutex<mpsc::UnboundedReceiver<Mail>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_stores(config, Stores::in_memory())
    }

    pub fn with_stores(config: ServerConfig, stores: Stores) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let (tx, rx) = mpsc::unbounded_channel();
        let state = AppState::new(
            config,
            stores,
            Arc::new(RecordingMailer(tx)),
            clock.clone(),
        );
        Self {
            router: build_app_router(state.clone()),
            state,
            clock,
            mail: Mutex::new(rx),
        }
    }

    /// Next message handed to the mailer. Panics after five seconds.
    pub async fn next_mail(&self) -> Mail {
        let mut rx = self.mail.lock().await;
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no mail was sent")
            .expect("mail channel closed")
    }

    /// True when no message is waiting after a short grace period.
    pub async fn no_mail(&self) -> bool {
        let mut rx = self.mail.lock().await;
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.send(request(Method::PUT, uri, token, Some(body))).await
    }

    pub async fn patch_json(&self, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    /// Register `email`, activate it through the emailed token and log in.
    /// Returns the authentication token.
    pub async fn activated_user(&self, email: &str) -> String {
        let user_id = self.register(email).await;
        let Mail::Activation { token, .. } = self.next_mail().await else {
            panic!("expected an activation mail");
        };
        let response = self
            .put_json("/v1/users/activated", None, json!({ "token": token }))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["id"], user_id);
        self.login(email).await
    }

    /// Like [`activated_user`](Self::activated_user), also granting
    /// `forums::write`.
    pub async fn writer(&self, email: &str) -> String {
        let token = self.activated_user(email).await;
        let user = self
            .state
            .stores
            .users
            .get_by_email(email)
            .await
            .unwrap()
            .unwrap();
        self.state
            .stores
            .permissions
            .add_for_user(user.id, &[FORUMS_WRITE])
            .await
            .unwrap();
        token
    }

    /// Register `email` and return the new user id.
    pub async fn register(&self, email: &str) -> i64 {
        let response = self
            .post_json(
                "/v1/users",
                None,
                json!({ "name": "Test User", "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["id"].as_i64().unwrap()
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .post_json(
                "/v1/tokens/authentication",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["token"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

/// Build a request with an optional bearer token and JSON body.
pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Attach a peer address, as the production listener does.
pub fn from_peer(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
