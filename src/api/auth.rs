//! Authentication endpoints.
//!
//! - POST `/register` - Create an account (does not log in)
//! - POST `/login` - Verify credentials and set both session cookies
//! - POST `/logout` - Expire both session cookies
//! - POST `/refresh-token` - Exchange the refresh cookie for a new access cookie
//! - GET `/check-auth` - Report whether the refresh cookie holds a live session

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::MessageResponse;
use super::error::{ApiError, ResultExt, required};
use crate::auth::{
    Auth, access_cookie, attach_session, clear_session, read_refresh_cookie, require_auth,
};
use crate::db::{CreateUserError, Database};
use crate::impl_has_auth_backend;
use crate::jwt::{Identity, JwtConfig};
use crate::password::PasswordHasher;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

/// Returned for both an unknown email and a wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub hasher: PasswordHasher,
    pub secure_cookies: bool,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_login,
        ));

    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_register,
        ));

    Router::new()
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/check-auth", get(check_auth))
        .with_state(state)
        .merge(login_router)
        .merge(register_router)
}

/// A protected greeting, showing the gate in front of a handler.
pub fn protected_router(state: AuthState) -> Router {
    Router::new()
        .route("/", get(protected))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<AuthState>,
        ))
        .with_state(state)
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    debug!(error = %rejection, "Rejected request body");
    ApiError::bad_request("Invalid request body.")
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    message: &'static str,
    user_id: i64,
}

async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(invalid_body)?;

    let (Some(username), Some(email), Some(password)) = (
        required(payload.username),
        required(payload.email),
        required(payload.password),
    ) else {
        return Err(ApiError::bad_request("All fields are required."));
    };
    let username = username.trim();
    let email = email.trim();

    let users = state.db.users(&state.hasher);

    // Fast path only; the unique index below is authoritative.
    if users
        .email_exists(email)
        .await
        .db_err("Failed to check email")?
    {
        return Err(ApiError::conflict("User already exists!"));
    }

    let user_id = match users.create(username, email, &password).await {
        Ok(id) => id,
        Err(CreateUserError::DuplicateEmail) => {
            return Err(ApiError::conflict("User already exists!"));
        }
        Err(e) => return Err(ApiError::internal_error("Failed to create user", e)),
    };

    info!(user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully!",
            user_id,
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.map_err(invalid_body)?;

    let (Some(email), Some(password)) = (required(payload.email), required(payload.password))
    else {
        return Err(ApiError::bad_request("Email and password are required."));
    };

    let user = state
        .db
        .users(&state.hasher)
        .verify_credentials(email.trim(), &password)
        .await
        .internal_err("Failed to verify credentials")?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let identity = user.identity();
    let access = state
        .jwt
        .issue_access_token(&identity)
        .internal_err("Failed to generate access token")?;
    let refresh = state
        .jwt
        .issue_refresh_token(&identity)
        .internal_err("Failed to generate refresh token")?;

    info!(user_id = user.id, "User logged in");

    Ok((
        attach_session(&access.token, &refresh.token, state.secure_cookies),
        Json(MessageResponse::new("Login successful!")),
    ))
}

/// Clears the session unconditionally; no cookie is required.
async fn logout(State(state): State<AuthState>) -> impl IntoResponse {
    (
        clear_session(state.secure_cookies),
        Json(MessageResponse::new("Logout successful!")),
    )
}

/// Mint a new access token from the claims inside the refresh token.
/// The refresh cookie itself is left untouched.
async fn refresh_token(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token =
        read_refresh_cookie(&headers).ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    let claims = state.jwt.verify_refresh_token(token).map_err(|e| {
        debug!(reason = %e, "Refresh token rejected");
        ApiError::forbidden("Invalid or expired refresh token")
    })?;

    let access = state
        .jwt
        .issue_access_token(&claims.identity())
        .internal_err("Failed to generate access token")?;

    Ok((
        [(SET_COOKIE, access_cookie(&access.token, state.secure_cookies))],
        Json(MessageResponse::new("Access token refreshed!")),
    ))
}

#[derive(Serialize)]
struct CheckAuthResponse {
    #[serde(flatten)]
    identity: Option<Identity>,
    #[serde(rename = "isLoggedIn")]
    is_logged_in: bool,
}

/// Side-effect-free session check keyed on the refresh cookie.
async fn check_auth(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    let identity = read_refresh_cookie(&headers)
        .and_then(|token| {
            state
                .jwt
                .verify_refresh_token(token)
                .map_err(|e| debug!(reason = %e, "Check-auth refresh token rejected"))
                .ok()
        })
        .map(|claims| claims.identity());

    match identity {
        Some(identity) => (
            StatusCode::OK,
            Json(CheckAuthResponse {
                identity: Some(identity),
                is_logged_in: true,
            }),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(CheckAuthResponse {
                identity: None,
                is_logged_in: false,
            }),
        )
            .into_response(),
    }
}

async fn protected(Auth(user): Auth) -> Json<MessageResponse<String>> {
    Json(MessageResponse::new(format!(
        "Hello, {}! You have access to this route.",
        user.username()
    )))
}
