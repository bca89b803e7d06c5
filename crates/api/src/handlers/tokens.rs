//! Handlers for token issuance and revocation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use forum_core::error::CoreError;
use forum_core::tokens::{TokenScope, ACTIVATION_TTL, AUTHENTICATION_TTL, PASSWORD_RESET_TTL};
use forum_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password::verify_password_blocking;
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::handlers::validate_email_present;
use crate::mailer::{dispatch, Mail};
use crate::middleware::rbac::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(
        custom(function = "validate_email_present"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "must be provided"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[serde(default)]
    #[validate(
        custom(function = "validate_email_present"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
}

/// Body of a freshly issued authentication token.
#[derive(Debug, Serialize)]
pub struct TokenBody {
    pub token: String,
    pub expiry: Timestamp,
}

/// POST /v1/tokens/authentication
///
/// Unknown email and wrong password fail identically.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .stores
        .users
        .get_by_email(&input.email)
        .await?
        .ok_or(CoreError::InvalidCredentials)?;

    if !verify_password_blocking(input.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = user.id, "Login rejected");
        return Err(CoreError::InvalidCredentials.into());
    }

    let token = state
        .tokens
        .issue(user.id, AUTHENTICATION_TTL, TokenScope::Authentication)
        .await?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: TokenBody {
                token: token.plaintext,
                expiry: token.expiry,
            },
        }),
    ))
}

/// DELETE /v1/tokens/authentication
///
/// Revokes every authentication token of the caller, not just the one
/// presented.
pub async fn logout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    let revoked = state
        .tokens
        .revoke_all(user.id, TokenScope::Authentication)
        .await?;

    tracing::info!(user_id = user.id, revoked, "User logged out");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/tokens/password-reset
///
/// Always 202 so the response does not reveal whether the address is
/// registered.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<EmailRequest>,
) -> AppResult<impl IntoResponse> {
    match state.stores.users.get_by_email(&input.email).await? {
        Some(user) if user.activated => {
            let token = state
                .tokens
                .issue(user.id, PASSWORD_RESET_TTL, TokenScope::PasswordReset)
                .await?;
            dispatch(
                state.mailer.clone(),
                Mail::PasswordReset {
                    to: user.email,
                    token: token.plaintext,
                },
            );
        }
        Some(user) => tracing::debug!(user_id = user.id, "Password reset for inactive account skipped"),
        None => tracing::debug!("Password reset for unknown address skipped"),
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse::message(
            "an email will be sent to you containing password reset instructions",
        )),
    ))
}

/// POST /v1/tokens/activation
///
/// Re-sends an activation token. Always 202.
pub async fn resend_activation(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<EmailRequest>,
) -> AppResult<impl IntoResponse> {
    match state.stores.users.get_by_email(&input.email).await? {
        Some(user) if !user.activated => {
            let token = state
                .tokens
                .issue(user.id, ACTIVATION_TTL, TokenScope::Activation)
                .await?;
            dispatch(
                state.mailer.clone(),
                Mail::Activation {
                    to: user.email,
                    user_id: user.id,
                    token: token.plaintext,
                },
            );
        }
        Some(user) => tracing::debug!(user_id = user.id, "Activation re-send for active account skipped"),
        None => tracing::debug!("Activation re-send for unknown address skipped"),
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse::message(
            "an email will be sent to you containing activation instructions",
        )),
    ))
}
