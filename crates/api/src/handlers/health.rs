use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `available` whenever the process can serve requests and reach storage.
    pub status: &'static str,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub environment: String,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET /v1/healthcheck
pub async fn healthcheck(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    state
        .stores
        .health
        .ping()
        .await
        .map_err(|e| AppError::InternalError(format!("storage health check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "available",
        system_info: SystemInfo {
            environment: state.config.environment.clone(),
            version: env!("CARGO_PKG_VERSION"),
        },
    }))
}
