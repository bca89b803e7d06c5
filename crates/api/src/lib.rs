//! Forum API server library.
//!
//! Exposes the building blocks (config, state, error handling, middleware,
//! routes, background jobs) so integration tests and the binary entrypoint
//! share one router.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
