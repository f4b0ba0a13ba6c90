pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::{AuthState, create_api_router, protected_router};
use axum::{Router, routing::get};
use db::Database;
use jwt::JwtConfig;
use password::PasswordHasher;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens, independent of the access secret
    pub refresh_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
    /// Per-IP budgets for login and registration
    pub rate_limit: RateLimitConfig,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.access_secret, &config.refresh_secret));
    let hasher = PasswordHasher::new(config.bcrypt_cost);

    let protected_state = AuthState {
        db: config.db.clone(),
        jwt: jwt.clone(),
        hasher: hasher.clone(),
        secure_cookies: config.secure_cookies,
        rate_limit: Arc::new(config.rate_limit.clone()),
    };

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        hasher,
        config.secure_cookies,
        Arc::new(config.rate_limit.clone()),
    );

    Router::new()
        .route("/", get(|| async { "Server is running" }))
        .nest("/protected", protected_router(protected_state))
        .nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Also starts the task that prunes idle rate-limit keys.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let cleanup = rate_limit::spawn_cleanup_scheduler(config.rate_limit.clone());
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let result = axum::serve(listener, make_service).await;
    cleanup.abort();
    result
}
