//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::password::{DEFAULT_COST, MAX_COST, MIN_COST};
use crate::rate_limit::{DEFAULT_LOGIN_PER_MINUTE, DEFAULT_REGISTER_PER_MINUTE, RateLimitConfig};
use clap::Parser;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

pub const ACCESS_SECRET_ENV: &str = "JWT_SECRET";
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "jobboard", about = "Job board API with cookie-based JWT sessions")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "jobboard.db")]
    pub database: String,

    /// Mark session cookies Secure (serve over HTTPS)
    #[arg(long, env = "PRODUCTION")]
    pub production: bool,

    /// bcrypt work factor for new password hashes
    #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(i64::from(MIN_COST)..=i64::from(MAX_COST)))]
    pub bcrypt_cost: u32,

    /// Path to file containing the access token secret. Prefer the JWT_SECRET env var
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer the REFRESH_TOKEN_SECRET env var
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Login attempts allowed per minute per client IP
    #[arg(long, env = "LOGIN_PER_MINUTE", default_value_t = DEFAULT_LOGIN_PER_MINUTE)]
    pub login_per_minute: u32,

    /// Registrations allowed per minute per client IP
    #[arg(long, env = "REGISTER_PER_MINUTE", default_value_t = DEFAULT_REGISTER_PER_MINUTE)]
    pub register_per_minute: u32,

    /// Key rate limits on X-Forwarded-For (only behind a trusted proxy)
    #[arg(long, env = "TRUST_PROXY")]
    pub trust_proxy: bool,

    /// Log output format
    #[arg(short, long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("{0} is shorter than {min} characters. Use a longer secret", min = MIN_SECRET_LENGTH)]
    TooShort(&'static str),
    #[error("JWT_SECRET and REFRESH_TOKEN_SECRET must be different")]
    Identical,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Check that each secret is long enough and that the two are independent.
pub fn validate_secrets(access: &str, refresh: &str) -> Result<(), SecretError> {
    if access.len() < MIN_SECRET_LENGTH {
        return Err(SecretError::TooShort(ACCESS_SECRET_ENV));
    }
    if refresh.len() < MIN_SECRET_LENGTH {
        return Err(SecretError::TooShort(REFRESH_SECRET_ENV));
    }
    if access == refresh {
        return Err(SecretError::Identical);
    }
    Ok(())
}

/// Load one secret from its environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
fn load_secret(env_name: &'static str, file: Option<&str>) -> Option<String> {
    if let Ok(secret) = std::env::var(env_name) {
        // Clear the environment variable to prevent leaking
        // SAFETY: `main` calls this before building the tokio runtime, so no
        // other thread exists to read or write the environment concurrently.
        unsafe { std::env::remove_var(env_name) };
        return Some(secret);
    }

    if let Some(path) = file {
        return match std::fs::read_to_string(path) {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                None
            }
        };
    }

    error!("{} is required. Set the environment variable or pass a secret file", env_name);
    None
}

/// Load and validate both token secrets.
/// Returns `(access, refresh)`, or None after logging why startup must stop.
///
/// Removes the environment variables it reads, so call it before any other
/// thread is spawned.
pub fn load_secrets(
    jwt_secret_file: Option<&str>,
    refresh_secret_file: Option<&str>,
) -> Option<(String, String)> {
    let access = load_secret(ACCESS_SECRET_ENV, jwt_secret_file)?;
    let refresh = load_secret(REFRESH_SECRET_ENV, refresh_secret_file)?;

    if let Err(e) = validate_secrets(&access, &refresh) {
        error!("{}", e);
        return None;
    }

    Some((access, refresh))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, access: String, refresh: String) -> ServerConfig {
    ServerConfig {
        db,
        access_secret: access.into_bytes(),
        refresh_secret: refresh.into_bytes(),
        secure_cookies: args.production,
        bcrypt_cost: args.bcrypt_cost,
        rate_limit: RateLimitConfig::new(
            args.login_per_minute,
            args.register_per_minute,
            args.trust_proxy,
        ),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
