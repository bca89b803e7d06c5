//! Periodic purge of expired tokens.
//!
//! Expired tokens never validate whether or not they are still stored; this
//! only keeps the table small.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::tokens::TokenService;

/// Delete expired tokens every `every` until `cancel` is triggered.
pub async fn run(tokens: Arc<TokenService>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Token cleanup job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Token cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match tokens.purge_expired().await {
                    Ok(0) => tracing::debug!("Token cleanup: nothing to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Token cleanup: purged expired tokens"),
                    Err(e) => tracing::error!(error = %e, "Token cleanup failed"),
                }
            }
        }
    }
}
