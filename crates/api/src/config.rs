use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use forum_core::rate_limit::RateLimitConfig;
use forum_db::PoolConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// Everything except `DATABASE_URL` has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `4000`).
    pub port: u16,
    /// Reported by the health check (default: `development`).
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_idle_timeout_secs: u64,
    /// Upper bound on any single storage call (default: `3`).
    pub db_query_timeout_secs: u64,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// Whole-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for background tasks to stop after shutdown begins.
    pub shutdown_timeout_secs: u64,
    pub rate_limit: RateLimitConfig,
    /// Key the rate limiter on `X-Forwarded-For` / `X-Real-IP` instead of the
    /// peer address. Only enable behind a trusted proxy.
    pub trust_proxy_headers: bool,
    pub token_cleanup_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `4000`                  |
    /// | `APP_ENV`                     | `development`           |
    /// | `DATABASE_URL`                | required                |
    /// | `DB_MAX_CONNECTIONS`          | `25`                    |
    /// | `DB_IDLE_TIMEOUT_SECS`        | `900`                   |
    /// | `DB_QUERY_TIMEOUT_SECS`       | `3`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `LIMITER_ENABLED`             | `true`                  |
    /// | `LIMITER_RPS`                 | `2`                     |
    /// | `LIMITER_BURST`               | `4`                     |
    /// | `LIMITER_IDLE_SECS`           | `180`                   |
    /// | `LIMITER_SWEEP_SECS`          | `60`                    |
    /// | `TRUST_PROXY_HEADERS`         | `false`                 |
    /// | `TOKEN_CLEANUP_INTERVAL_SECS` | `3600`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let cors_origins: Vec<String> = vars
            .string("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            if let Err(e) = origin.parse::<HeaderValue>() {
                return Err(ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    value: origin.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let rate_limit = RateLimitConfig {
            enabled: vars.parse("LIMITER_ENABLED", true)?,
            requests_per_second: vars.parse("LIMITER_RPS", 2.0)?,
            burst: vars.parse("LIMITER_BURST", 4)?,
            idle_timeout: Duration::from_secs(vars.parse("LIMITER_IDLE_SECS", 180)?),
            sweep_interval: Duration::from_secs(vars.parse("LIMITER_SWEEP_SECS", 60)?),
        };
        if rate_limit.enabled {
            vars.ensure(
                "LIMITER_RPS",
                rate_limit.requests_per_second.is_finite() && rate_limit.requests_per_second > 0.0,
                "must be a positive number",
            )?;
            vars.ensure("LIMITER_BURST", rate_limit.burst >= 1, "must be at least 1")?;
            vars.ensure(
                "LIMITER_SWEEP_SECS",
                !rate_limit.sweep_interval.is_zero(),
                "must be at least 1",
            )?;
        }

        let config = Self {
            host: vars.string("HOST", "0.0.0.0"),
            port: vars.parse("PORT", 4000)?,
            environment: vars.string("APP_ENV", "development"),
            database_url: vars.required("DATABASE_URL")?,
            db_max_connections: vars.parse("DB_MAX_CONNECTIONS", 25)?,
            db_idle_timeout_secs: vars.parse("DB_IDLE_TIMEOUT_SECS", 900)?,
            db_query_timeout_secs: vars.parse("DB_QUERY_TIMEOUT_SECS", 3)?,
            cors_origins,
            request_timeout_secs: vars.parse("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: vars.parse("SHUTDOWN_TIMEOUT_SECS", 30)?,
            rate_limit,
            trust_proxy_headers: vars.parse("TRUST_PROXY_HEADERS", false)?,
            token_cleanup_interval_secs: vars.parse("TOKEN_CLEANUP_INTERVAL_SECS", 3600)?,
        };
        vars.ensure(
            "TOKEN_CLEANUP_INTERVAL_SECS",
            config.token_cleanup_interval_secs > 0,
            "must be at least 1",
        )?;
        Ok(config)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.db_max_connections,
            idle_timeout: Duration::from_secs(self.db_idle_timeout_secs),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.db_query_timeout_secs)
    }

    pub fn token_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.token_cleanup_interval_secs)
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn ensure(&self, name: &'static str, ok: bool, reason: &str) -> Result<(), ConfigError> {
        if ok {
            return Ok(());
        }
        Err(ConfigError::Invalid {
            name,
            value: self.get(name).unwrap_or_default(),
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/forum")]).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.environment, "development");
        assert_eq!(config.db_query_timeout_secs, 3);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.burst, 4);
        assert_eq!(config.rate_limit.idle_timeout, Duration::from_secs(180));
        assert!(!config.trust_proxy_headers);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173".to_string()]);
    }

    #[test]
    fn database_url_is_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = load(&[("DATABASE_URL", "x"), ("PORT", "eighty")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "PORT", .. });
    }

    #[test]
    fn limiter_rate_must_be_positive_when_enabled() {
        let err = load(&[("DATABASE_URL", "x"), ("LIMITER_RPS", "0")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "LIMITER_RPS", .. });

        let config = load(&[
            ("DATABASE_URL", "x"),
            ("LIMITER_ENABLED", "false"),
            ("LIMITER_RPS", "0"),
        ])
        .unwrap();
        assert!(!config.rate_limit.enabled);
    }
}
