//! Request middleware and authorization extractors.
//!
//! Applied in this order on the way in:
//!
//! - [`errors::log_server_errors`] -- logs the cause of every 500.
//! - [`rate_limit::rate_limit`] -- per-client token buckets, 429 on overflow.
//! - [`auth::authenticate`] -- resolves the bearer token into an
//!   [`Identity`](forum_core::permissions::Identity) request extension.
//!
//! Handlers then gate themselves with the extractors in [`rbac`].

pub mod auth;
pub mod errors;
pub mod rate_limit;
pub mod rbac;
