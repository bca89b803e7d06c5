//! Handlers for user registration, activation and password reset.
//!
//! None of these endpoints sit behind the permission gate: an unactivated
//! user must always be able to reach the activation endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use forum_core::error::CoreError;
use forum_core::permissions::DEFAULT_CAPABILITIES;
use forum_core::tokens::{GeneratedToken, TokenScope, ACTIVATION_TTL, PLAINTEXT_LEN};
use forum_core::validation::rule_error;
use forum_db::models::user::{NewUser, User, USERS_EMAIL_KEY};
use forum_db::store::ResourceStore;
use forum_db::StoreError;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::auth::password::{hash_password_blocking, validate_password_strength};
use crate::auth::tokens::TokenError;
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::handlers::{validate_email_present, validate_name};
use crate::mailer::{dispatch, Mail};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(
        custom(function = "validate_email_present"),
        email(message = "must be a valid email address")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ActivateRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_token_plaintext"))]
    pub token: String,
}

#[derive(Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,
    #[serde(default)]
    #[validate(custom(function = "validate_token_plaintext"))]
    pub token: String,
}

/// Token fields in request bodies: present and exactly as long as an issued
/// token.
pub(crate) fn validate_token_plaintext(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(rule_error("required", "must be provided"));
    }
    if token.len() != PLAINTEXT_LEN {
        return Err(rule_error(
            "length",
            format!("must be {PLAINTEXT_LEN} bytes long"),
        ));
    }
    Ok(())
}

/// POST /v1/users
///
/// Create an unactivated account holding the default capabilities and mail
/// it an activation token.
pub async fn register(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let password_hash = hash_password_blocking(input.password).await?;

    let draft = NewUser {
        name: input.name,
        email: input.email,
        password_hash,
        activated: false,
    };
    let user = match state.stores.users.insert(&draft).await {
        Ok(user) => user,
        Err(e) if e.is_duplicate_of(USERS_EMAIL_KEY) => {
            return Err(CoreError::field("email", "a user with this email address already exists").into());
        }
        Err(e) => return Err(e.into()),
    };

    let token = match provision(&state, &user).await {
        Ok(token) => token,
        Err(e) => {
            // Remove the half-made account so the email can register again.
            if let Err(cleanup) = state.stores.users.delete(user.id).await {
                tracing::error!(user_id = user.id, error = %cleanup, "Failed to roll back registration");
            }
            return Err(e.into());
        }
    };
    dispatch(
        state.mailer.clone(),
        Mail::Activation {
            to: user.email.clone(),
            user_id: user.id,
            token: token.plaintext,
        },
    );

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// Grant the default capabilities and mint the activation token.
async fn provision(state: &AppState, user: &User) -> Result<GeneratedToken, StoreError> {
    state
        .stores
        .permissions
        .add_for_user(user.id, DEFAULT_CAPABILITIES)
        .await?;
    state
        .tokens
        .issue(user.id, ACTIVATION_TTL, TokenScope::Activation)
        .await
}

/// PUT /v1/users/activated
pub async fn activate(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ActivateRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    let mut user = token_owner(
        &state,
        &input.token,
        TokenScope::Activation,
        "invalid or expired activation token",
    )
    .await?;

    user.activated = true;
    let user = state.stores.users.update(&user).await?;
    state.tokens.revoke_all(user.id, TokenScope::Activation).await?;

    tracing::info!(user_id = user.id, "User activated");

    Ok(Json(DataResponse { data: user }))
}

/// PUT /v1/users/password
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<ResetPasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let mut user = token_owner(
        &state,
        &input.token,
        TokenScope::PasswordReset,
        "invalid or expired password reset token",
    )
    .await?;

    user.password_hash = hash_password_blocking(input.password).await?;
    let user = state.stores.users.update(&user).await?;
    state
        .tokens
        .revoke_all(user.id, TokenScope::PasswordReset)
        .await?;

    tracing::info!(user_id = user.id, "Password reset");

    Ok(Json(DataResponse::message(
        "your password was successfully reset",
    )))
}

/// Resolve a token carried in a request body. Unknown, expired and
/// ill-formed tokens are all reported on the `token` field.
async fn token_owner(
    state: &AppState,
    plaintext: &str,
    scope: TokenScope,
    message: &str,
) -> AppResult<User> {
    match state.tokens.validate(plaintext, scope).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) | Err(TokenError::Malformed(_)) => Err(CoreError::field("token", message).into()),
        Err(TokenError::Store(e)) => Err(AppError::from(e)),
    }
}
