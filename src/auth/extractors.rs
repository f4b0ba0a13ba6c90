//! The authentication gate: an axum middleware and an extractor sharing one check.
//!
//! The gate only reads the access cookie. It never refreshes; a client that
//! gets 401/403 calls the refresh endpoint itself and retries.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::cookie::read_access_cookie;
use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::jwt::JwtConfig;

/// Core check shared by the middleware and the extractor.
pub fn authenticate_request(
    headers: &HeaderMap,
    jwt: &JwtConfig,
) -> Result<AuthenticatedUser, AuthErrorKind> {
    let token = read_access_cookie(headers).ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = jwt.verify_access_token(token).map_err(|e| {
        debug!(reason = %e, "Access token rejected");
        AuthErrorKind::InvalidToken
    })?;

    Ok(AuthenticatedUser { claims })
}

/// Route layer guarding protected routes. On success the caller's
/// [`AuthenticatedUser`] is attached to the request extensions.
///
/// ```ignore
/// router.route_layer(middleware::from_fn_with_state(state, require_auth::<MyState>))
/// ```
pub async fn require_auth<S>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    S: HasAuthBackend + Clone + Send + Sync,
{
    let user = authenticate_request(request.headers(), state.jwt())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for handlers that require authentication.
///
/// Reuses the identity attached by [`require_auth`] when the route is
/// layered; otherwise performs the same check itself.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(Auth(user.clone()));
        }

        authenticate_request(&parts.headers, state.jwt())
            .map(Auth)
            .map_err(AuthError::from)
    }
}
