//! A typed extractor that pulls the bearer access token out of the
//! `Authorization` header and verifies it against the application's
//! authenticator.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::bootstrap::AppState;
use crate::http::error::ApiError;

/// The authenticated caller's user id, extracted from a verified access
/// token.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| distcalc_shared::errors::AuthError::InvalidToken)?;

        let claims = state.authenticator.verify_access(bearer.token())?;
        Ok(AuthUser(claims.sub))
    }
}
