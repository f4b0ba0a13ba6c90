//! Session cookies: the transport that carries tokens to and from the browser.
//!
//! A browser session is exactly two cookies. Login overwrites both, refresh
//! overwrites only the access cookie, logout expires both.

use axum::http::{HeaderMap, HeaderName, header};
use axum::response::AppendHeaders;

use crate::jwt::{ACCESS_TOKEN_DURATION_SECS, REFRESH_TOKEN_DURATION_SECS};

/// Cookie name for the access token (short-lived, 15 minutes).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived, 24 hours).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Browser-side lifetime of the access cookie.
pub const ACCESS_COOKIE_MAX_AGE_SECS: u64 = ACCESS_TOKEN_DURATION_SECS;

/// Never longer than the refresh token itself, so the browser does not keep
/// sending a token that can no longer verify.
pub const REFRESH_COOKIE_MAX_AGE_SECS: u64 = REFRESH_TOKEN_DURATION_SECS;

const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// `Set-Cookie` headers for a full session (both cookies).
pub type SessionCookies = AppendHeaders<[(HeaderName, String); 2]>;

/// Extract a cookie value from the Cookie header.
/// Empty values are skipped, so a stale cleared cookie sent alongside a live
/// one does not hide it.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim();
            if key.trim() == name && !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Raw access token from the request, if one was presented.
/// An empty value (a cleared cookie) counts as absent.
pub fn read_access_cookie(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, ACCESS_COOKIE_NAME).filter(|v| !v.is_empty())
}

/// Raw refresh token from the request, if one was presented.
pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, REFRESH_COOKIE_NAME).filter(|v| !v.is_empty())
}

fn secure_attr(secure: bool) -> &'static str {
    if secure { "; Secure" } else { "" }
}

fn session_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        name,
        value,
        max_age,
        secure_attr(secure)
    )
}

/// `Set-Cookie` value carrying a new access token.
pub fn access_cookie(token: &str, secure: bool) -> String {
    session_cookie(ACCESS_COOKIE_NAME, token, ACCESS_COOKIE_MAX_AGE_SECS, secure)
}

/// `Set-Cookie` value carrying a new refresh token.
pub fn refresh_cookie(token: &str, secure: bool) -> String {
    session_cookie(REFRESH_COOKIE_NAME, token, REFRESH_COOKIE_MAX_AGE_SECS, secure)
}

/// `Set-Cookie` value that makes the browser drop the named cookie.
pub fn cleared_cookie(name: &str, secure: bool) -> String {
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Expires={}{}",
        name,
        EPOCH,
        secure_attr(secure)
    )
}

/// Set both session cookies.
pub fn attach_session(access_token: &str, refresh_token: &str, secure: bool) -> SessionCookies {
    AppendHeaders([
        (header::SET_COOKIE, access_cookie(access_token, secure)),
        (header::SET_COOKIE, refresh_cookie(refresh_token, secure)),
    ])
}

/// Expire both session cookies. Safe to send when no session exists.
pub fn clear_session(secure: bool) -> SessionCookies {
    AppendHeaders([
        (header::SET_COOKIE, cleared_cookie(ACCESS_COOKIE_NAME, secure)),
        (header::SET_COOKIE, cleared_cookie(REFRESH_COOKIE_NAME, secure)),
    ])
}
