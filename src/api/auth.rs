use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::{error::ApiError, AppState};

/// The caller's user id, taken from the identity header set upstream.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&*state.user_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(|user| AuthUser(user.to_owned()))
            .ok_or(ApiError::Unauthorized)
    }
}
