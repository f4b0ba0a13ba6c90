#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use jobboard::{
    ServerConfig, create_app,
    db::Database,
    jwt::{Identity, JwtConfig},
    password::{MIN_COST, PasswordHasher},
    rate_limit::RateLimitConfig,
};
use serde_json::Value;
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-for-integration";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-for-integration";

pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

impl TestApp {
    /// Send one request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Test app over an in-memory database with effectively unlimited rate limits.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(RateLimitConfig::new(10_000, 10_000, false), false).await
}

pub async fn create_test_app_with(rate_limit: RateLimitConfig, secure_cookies: bool) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        secure_cookies,
        bcrypt_cost: MIN_COST,
        rate_limit,
    };
    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET),
    }
}

/// Insert a user directly and return its identity.
pub async fn create_user(db: &Database, username: &str, email: &str) -> Identity {
    let id = db
        .users(&PasswordHasher::new(MIN_COST))
        .create(username, email, PASSWORD)
        .await
        .unwrap();
    Identity {
        id,
        username: username.to_string(),
        email: email.to_string(),
    }
}

/// Cookie header carrying a fresh access token for the identity.
pub fn access_cookie_header(jwt: &JwtConfig, identity: &Identity) -> String {
    format!(
        "accessToken={}",
        jwt.issue_access_token(identity).unwrap().token
    )
}

/// Cookie header carrying a fresh refresh token for the identity.
pub fn refresh_cookie_header(jwt: &JwtConfig, identity: &Identity) -> String {
    format!(
        "refreshToken={}",
        jwt.issue_refresh_token(identity).unwrap().token
    )
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request_with_cookie(method: &str, uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("cookie", cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// The Set-Cookie header for the named cookie, if any.
pub fn find_cookie<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    cookies
        .iter()
        .find(|c| c.starts_with(&prefix))
        .map(String::as_str)
}

/// The value part of a Set-Cookie header (`name=value; ...`).
pub fn cookie_value(set_cookie: &str) -> &str {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value)
        .unwrap_or("")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Register then log in through the API, returning the `Cookie` header value
/// a browser would send afterwards.
pub async fn register_and_login(app: &TestApp, username: &str, email: &str) -> String {
    let response = app
        .send(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({ "username": username, "email": email, "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), 200);

    let cookies = extract_set_cookies(&response);
    let access = cookie_value(find_cookie(&cookies, "accessToken").unwrap());
    let refresh = cookie_value(find_cookie(&cookies, "refreshToken").unwrap());
    format!("accessToken={}; refreshToken={}", access, refresh)
}
