//! Periodic eviction of idle rate limiter buckets.
//!
//! Without this, the bucket map grows with every distinct client address
//! ever seen.

use std::sync::Arc;
use std::time::Instant;

use forum_core::rate_limit::RateLimiter;
use tokio_util::sync::CancellationToken;

/// Evict buckets idle for longer than the limiter's `idle_timeout`, every
/// `sweep_interval`, until `cancel` is triggered.
pub async fn run(limiter: Arc<RateLimiter>, cancel: CancellationToken) {
    let sweep_interval = limiter.config().sweep_interval;
    tracing::info!(
        interval_secs = sweep_interval.as_secs(),
        idle_secs = limiter.config().idle_timeout.as_secs(),
        "Rate limiter sweep started"
    );

    let mut interval = tokio::time::interval(sweep_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Rate limiter sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = limiter.evict_idle(Instant::now());
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = limiter.tracked_clients(), "Evicted idle clients");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use forum_core::rate_limit::RateLimitConfig;

    #[tokio::test]
    async fn sweep_evicts_idle_clients_and_stops_on_cancel() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
            enabled: true,
            requests_per_second: 1.0,
            burst: 1,
            idle_timeout: Duration::from_millis(10),
            sweep_interval: Duration::from_millis(20),
        }));
        assert!(limiter.allow("198.51.100.4"));
        assert_eq!(limiter.tracked_clients(), 1);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(limiter.clone(), cancel.clone()));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(limiter.tracked_clients(), 0);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweep should stop after cancellation")
            .unwrap();
    }
}
