//! Domain logic for the forum API that has no I/O of its own.
//!
//! - [`tokens`] -- bearer token generation, digests and shape checks.
//! - [`permissions`] -- capability sets and the activation/permission gate.
//! - [`rate_limit`] -- per-client token buckets.
//! - [`filters`] -- listing filters, sort allow-lists and page metadata.

pub mod clock;
pub mod error;
pub mod filters;
pub mod permissions;
pub mod rate_limit;
pub mod tokens;
pub mod types;
pub mod validation;
