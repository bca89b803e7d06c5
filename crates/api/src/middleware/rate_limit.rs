//! Per-client admission control.
//!
//! Clients are keyed by peer IP address. When `TRUST_PROXY_HEADERS` is set,
//! the first `X-Forwarded-For` entry (or `X-Real-IP`) is used instead.
//! Requests whose address cannot be determined share the `unknown` bucket.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use forum_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

const UNKNOWN_CLIENT: &str = "unknown";

pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.rate_limiter.is_enabled() {
        return next.run(req).await;
    }

    let key = client_key(&req, state.config.trust_proxy_headers);
    if !state.rate_limiter.allow(&key) {
        tracing::debug!(client = %key, "Rate limit exceeded");
        return AppError::Core(CoreError::RateLimited).into_response();
    }
    next.run(req).await
}

fn client_key(req: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(req.headers()) {
            return ip;
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .or_else(|| header("x-real-ip"))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}
