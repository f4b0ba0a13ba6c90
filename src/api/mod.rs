mod auth;
mod categories;
mod error;
mod posts;

use axum::Router;
use serde::Serialize;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::password::PasswordHasher;
use crate::rate_limit::RateLimitConfig;

pub use auth::{AuthState, INVALID_CREDENTIALS, protected_router};
pub use error::{ApiError, INTERNAL_MESSAGE, ResultExt, required};

/// Body of every successful response that carries only a message.
#[derive(Serialize)]
pub(crate) struct MessageResponse<M = &'static str> {
    message: M,
}

impl<M> MessageResponse<M> {
    pub(crate) fn new(message: M) -> Self {
        Self { message }
    }
}

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    hasher: PasswordHasher,
    secure_cookies: bool,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
        hasher,
        secure_cookies,
        rate_limit,
    };

    let posts_state = posts::PostsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let categories_state = categories::CategoriesState { db, jwt };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/posts", posts::router(posts_state))
        .nest("/categories", categories::router(categories_state))
}
