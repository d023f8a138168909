use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

use crate::auth::dto::Session;
use crate::auth::issuer::project;
use crate::auth::jwt::JwtKeys;
use crate::auth::SESSION_COOKIE;
use crate::error::ApiError;

/// Session JWT from the session cookie, or from `Authorization: Bearer`.
pub fn session_jwt(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = CookieJar::from_headers(headers).get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::to_string)
}

/// Requires an established session; rejects with 401 otherwise.
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jwt = session_jwt(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let keys = JwtKeys::from_ref(state);
        let (token, _expires) = keys
            .decode_session(&jwt)
            .map_err(|_| ApiError::Unauthorized)?;
        Ok(AuthSession(project(&token)))
    }
}
