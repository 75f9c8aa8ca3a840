//! Caller identity. Authentication happens upstream; the verified subject
//! arrives in `x-auth-subject` and is exchanged for the local user here.

use {
    super::errors::ApiError,
    crate::{AppState, domain::error::PipelineError, domain::user::User, infra::postgres::user_repo},
    axum::{extract::FromRequestParts, http::request::Parts},
};

pub const SUBJECT_HEADER: &str = "x-auth-subject";

pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(SUBJECT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::Unauthorized("Unauthorized".into()))?;

        let user = user_repo::find_by_external_id(&state.pool, subject)
            .await?
            .ok_or_else(|| {
                PipelineError::NotFound(
                    "User not found in database. Please complete your profile first.".into(),
                )
            })?;

        Ok(Self(user))
    }
}

pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(|ApiError(err)| match err {
                PipelineError::NotFound(_) => {
                    ApiError(PipelineError::Unauthorized("Unauthorized".into()))
                }
                other => ApiError(other),
            })?;
        if !user.is_admin() {
            return Err(PipelineError::Unauthorized("Unauthorized".into()).into());
        }
        Ok(Self(user))
    }
}
