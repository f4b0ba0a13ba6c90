//! Cookie-based JWT authentication.
//!
//! Dual-token system: short-lived access tokens (15 min) authorize protected
//! requests, long-lived refresh tokens (24 h) only mint new access tokens.
//! Both are stateless and travel in HttpOnly cookies; nothing is stored
//! server-side, so a token stays valid until it expires.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_MAX_AGE_SECS, ACCESS_COOKIE_NAME, REFRESH_COOKIE_MAX_AGE_SECS,
    REFRESH_COOKIE_NAME, SessionCookies, access_cookie, attach_session, clear_session,
    cleared_cookie, get_cookie, read_access_cookie, read_refresh_cookie, refresh_cookie,
};
pub use errors::{AuthError, AuthErrorKind};
pub use extractors::{Auth, authenticate_request, require_auth};
pub use ip::{UNKNOWN_CLIENT, extract_client_ip};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
