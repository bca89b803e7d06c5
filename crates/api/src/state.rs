use std::sync::Arc;

use forum_core::clock::Clock;
use forum_core::rate_limit::RateLimiter;
use forum_db::Stores;

use crate::auth::tokens::TokenService;
use crate::config::ServerConfig;
use crate::mailer::Mailer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Storage backends behind trait objects.
    pub stores: Stores,
    pub tokens: Arc<TokenService>,
    /// Process-wide client buckets, also swept by a background task.
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        stores: Stores,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(
            stores.tokens.clone(),
            stores.users.clone(),
            clock,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            config: Arc::new(config),
            stores,
            tokens,
            rate_limiter,
            mailer,
        }
    }
}
