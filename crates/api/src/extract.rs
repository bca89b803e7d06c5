//! Request extractors shared by the resource handlers.

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use forum_core::error::CoreError;
use forum_core::types::DbId;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// Name of the optional precondition header on PATCH requests.
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

/// JSON body that has passed its `validator` rules.
///
/// Body rejections (bad syntax, wrong types, missing content type) become a
/// 400 carrying the rejection text; rule failures become a 422 with per-field
/// messages.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::Core(CoreError::Validation(errors.into())))?;
        Ok(ValidJson(value))
    }
}

/// Query string whose rejection is rendered as a JSON 400.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(QueryParams(value))
    }
}

/// Positive integer `{id}` path segment. Anything else is a 404.
#[derive(Debug, Clone, Copy)]
pub struct IdParam(pub DbId);

impl<S: Send + Sync> FromRequestParts<S> for IdParam {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| not_found())?;
        parse_id(&raw).map(IdParam).ok_or_else(not_found)
    }
}

fn parse_id(raw: &str) -> Option<DbId> {
    raw.parse::<DbId>().ok().filter(|id| *id >= 1)
}

fn not_found() -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "resource",
        id: 0,
    })
}

/// Value of the `X-Expected-Version` header, if sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectedVersion(pub Option<i32>);

impl<S: Send + Sync> FromRequestParts<S> for ExpectedVersion {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(EXPECTED_VERSION_HEADER) else {
            return Ok(ExpectedVersion(None));
        };
        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .map(|v| ExpectedVersion(Some(v)))
            .ok_or_else(|| {
                AppError::BadRequest("X-Expected-Version must be an integer".to_string())
            })
    }
}

impl ExpectedVersion {
    /// Fail with an edit conflict when a version was sent and `current`
    /// differs from it.
    pub fn check(self, entity: &'static str, id: DbId, current: i32) -> Result<(), AppError> {
        match self.0 {
            Some(expected) if expected != current => {
                Err(AppError::Core(CoreError::EditConflict { entity, id }))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("7"), Some(7));
        assert_eq!(parse_id("0"), None);
        assert_eq!(parse_id("-3"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id("1.5"), None);
    }

    #[test]
    fn expected_version_mismatch_is_a_conflict() {
        assert!(ExpectedVersion(None).check("forum", 1, 3).is_ok());
        assert!(ExpectedVersion(Some(3)).check("forum", 1, 3).is_ok());
        assert_matches!(
            ExpectedVersion(Some(2)).check("forum", 1, 3),
            Err(AppError::Core(CoreError::EditConflict { entity: "forum", id: 1 }))
        );
    }
}
