//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tracing::debug;

use crate::api::ApiError;
use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Default login attempts per minute per IP.
pub const DEFAULT_LOGIN_PER_MINUTE: u32 = 10;

/// Default registrations per minute per IP.
pub const DEFAULT_REGISTER_PER_MINUTE: u32 = 3;

/// How often idle client keys are dropped from the limiters.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub register: Arc<IpLimiter>,
    /// Key on `X-Forwarded-For` instead of the socket address
    pub trust_forwarded_for: bool,
}

fn per_minute(n: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN))
}

impl RateLimitConfig {
    pub fn new(login_per_minute: u32, register_per_minute: u32, trust_forwarded_for: bool) -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(per_minute(login_per_minute))),
            register: Arc::new(RateLimiter::keyed(per_minute(register_per_minute))),
            trust_forwarded_for,
        }
    }

    /// Drop keys whose bucket has fully refilled. Such a client is treated
    /// exactly like a new one, so forgetting it changes no decision.
    pub fn prune(&self) {
        for limiter in [&self.login, &self.register] {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }
}

/// Spawn a background task that prunes the limiters periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(config: RateLimitConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            config.prune();
            debug!(
                login_keys = config.login.len(),
                register_keys = config.register.len(),
                "Pruned rate limiters"
            );
        }
    })
}

async fn check(
    limiter: &IpLimiter,
    trust_forwarded_for: bool,
    message: &'static str,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, trust_forwarded_for);

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            ApiError::too_many_requests(message).into_response()
        }
    }
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.login,
        config.trust_forwarded_for,
        "Too many login attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

/// Middleware for rate limiting registrations.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.register,
        config.trust_forwarded_for,
        "Too many signup attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}
