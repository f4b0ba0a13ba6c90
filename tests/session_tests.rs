//! Tests for the dual-token session lifecycle.
//!
//! Tests cover:
//! - The gate in front of protected routes (missing vs rejected tokens)
//! - Silent refresh through the refresh-token endpoint
//! - The check-auth session check before and after login/logout

mod common;

use axum::http::StatusCode;
use common::{
    REFRESH_SECRET, access_cookie_header, cookie_value, create_test_app, create_user,
    extract_set_cookies, find_cookie, json_body, refresh_cookie_header, register_and_login,
    request,
};
use jobboard::jwt::{JwtConfig, TokenType};

// =============================================================================
// Gate
// =============================================================================

#[tokio::test]
async fn test_root_is_public() {
    let app = create_test_app().await;

    let response = app.send(request("GET", "/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"Server is running");
}

#[tokio::test]
async fn test_protected_with_valid_access_token() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let response = app
        .send(request(
            "GET",
            "/protected",
            Some(&access_cookie_header(&app.jwt, &alice)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(extract_set_cookies(&response).is_empty());

    let json = json_body(response).await;
    assert_eq!(
        json["message"],
        "Hello, alice! You have access to this route."
    );
}

#[tokio::test]
async fn test_protected_skips_empty_duplicate_cookie() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let cookie = format!("accessToken=; {}", access_cookie_header(&app.jwt, &alice));
    let response = app.send(request("GET", "/protected", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_without_cookie_is_unauthorized() {
    let app = create_test_app().await;

    let response = app.send(request("GET", "/protected", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(extract_set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_protected_with_wrongly_signed_token_is_forbidden() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let forged = JwtConfig::new(
        b"some-other-access-secret-entirely",
        b"some-other-refresh-secret-entirely",
    );

    let response = app
        .send(request(
            "GET",
            "/protected",
            Some(&access_cookie_header(&forged, &alice)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_protected_with_expired_token_is_forbidden() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let expired = app
        .jwt
        .issue_at(&alice, TokenType::Access, 1_000_000)
        .unwrap()
        .token;

    let response = app
        .send(request(
            "GET",
            "/protected",
            Some(&format!("accessToken={}", expired)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_expired_and_malformed_look_the_same() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let expired = app
        .jwt
        .issue_at(&alice, TokenType::Access, 1_000_000)
        .unwrap()
        .token;

    let a = app
        .send(request(
            "GET",
            "/protected",
            Some(&format!("accessToken={}", expired)),
        ))
        .await;
    let b = app
        .send(request("GET", "/protected", Some("accessToken=garbage")))
        .await;

    assert_eq!(a.status(), b.status());
    assert_eq!(json_body(a).await, json_body(b).await);
}

#[tokio::test]
async fn test_refresh_token_cannot_pass_the_gate() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;
    let refresh = app.jwt.issue_refresh_token(&alice).unwrap().token;

    // Only the refresh cookie: nothing to verify
    let response = app
        .send(request(
            "GET",
            "/protected",
            Some(&refresh_cookie_header(&app.jwt, &alice)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Refresh token smuggled into the access cookie
    let response = app
        .send(request(
            "GET",
            "/protected",
            Some(&format!("accessToken={}", refresh)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_issues_new_access_cookie_only() {
    let app = create_test_app().await;
    let cookie = register_and_login(&app, "alice", "alice@example.com").await;
    let refresh_only = cookie
        .split("; ")
        .find(|c| c.starts_with("refreshToken="))
        .unwrap()
        .to_string();

    let response = app
        .send(request("POST", "/api/auth/refresh-token", Some(&refresh_only)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    assert_eq!(cookies.len(), 1, "Refresh cookie must be left untouched");
    let access = find_cookie(&cookies, "accessToken").expect("new access cookie");
    assert!(access.contains("Max-Age=900"));
    assert!(access.contains("HttpOnly"));

    let claims = app.jwt.verify_access_token(cookie_value(access)).unwrap();
    let original = app
        .jwt
        .verify_refresh_token(refresh_only.trim_start_matches("refreshToken="))
        .unwrap();
    assert_eq!(claims.identity(), original.identity());

    let json = json_body(response).await;
    assert_eq!(json["message"], "Access token refreshed!");

    // The new access cookie passes the gate
    let response = app
        .send(request(
            "GET",
            "/protected",
            Some(&format!("accessToken={}", cookie_value(access))),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_cookie_is_unauthorized() {
    let app = create_test_app().await;

    let response = app
        .send(request("POST", "/api/auth/refresh-token", None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(extract_set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_refresh_with_expired_token_is_forbidden() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let expired = app
        .jwt
        .issue_at(&alice, TokenType::Refresh, 1_000_000)
        .unwrap()
        .token;

    let response = app
        .send(request(
            "POST",
            "/api/auth/refresh-token",
            Some(&format!("refreshToken={}", expired)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(extract_set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;
    let access = app.jwt.issue_access_token(&alice).unwrap().token;

    let response = app
        .send(request(
            "POST",
            "/api/auth/refresh-token",
            Some(&format!("refreshToken={}", access)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_concurrent_refreshes_all_succeed() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;
    let cookie = refresh_cookie_header(&app.jwt, &alice);

    let responses = refresh_concurrently(&app, &cookie).await;
    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
        let cookies = extract_set_cookies(&response);
        let access = find_cookie(&cookies, "accessToken").unwrap();
        assert!(app.jwt.verify_access_token(cookie_value(access)).is_ok());
    }
}

async fn refresh_concurrently(
    app: &common::TestApp,
    cookie: &str,
) -> Vec<axum::http::Response<axum::body::Body>> {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let app = app.app.clone();
            let req = request("POST", "/api/auth/refresh-token", Some(cookie));
            tokio::spawn(async move {
                use tower::ServiceExt;
                app.oneshot(req).await.unwrap()
            })
        })
        .collect();

    let mut responses = Vec::new();
    for handle in handles {
        responses.push(handle.await.unwrap());
    }
    responses
}

// =============================================================================
// Check-auth
// =============================================================================

#[tokio::test]
async fn test_check_auth_after_login() {
    let app = create_test_app().await;
    let cookie = register_and_login(&app, "alice", "alice@example.com").await;

    let response = app
        .send(request("GET", "/api/auth/check-auth", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(extract_set_cookies(&response).is_empty());

    let json = json_body(response).await;
    assert_eq!(json["isLoggedIn"], true);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["email"], "alice@example.com");
    assert!(json["id"].as_i64().is_some());
}

#[tokio::test]
async fn test_check_auth_ignores_access_cookie() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let response = app
        .send(request(
            "GET",
            "/api/auth/check-auth",
            Some(&access_cookie_header(&app.jwt, &alice)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json, serde_json::json!({ "isLoggedIn": false }));
}

#[tokio::test]
async fn test_check_auth_with_foreign_refresh_token() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    // Signature checks out against the refresh secret, but the token is an access token
    let swapped = JwtConfig::new(REFRESH_SECRET, b"unrelated-refresh-secret-value-xx");
    let token = swapped.issue_access_token(&alice).unwrap().token;

    let response = app
        .send(request(
            "GET",
            "/api/auth/check-auth",
            Some(&format!("refreshToken={}", token)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["isLoggedIn"], false);
}

#[tokio::test]
async fn test_check_auth_with_expired_refresh_token() {
    let app = create_test_app().await;
    let alice = create_user(&app.db, "alice", "alice@example.com").await;

    let expired = app
        .jwt
        .issue_at(&alice, TokenType::Refresh, 1_000_000)
        .unwrap()
        .token;

    let response = app
        .send(request(
            "GET",
            "/api/auth/check-auth",
            Some(&format!("refreshToken={}", expired)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(extract_set_cookies(&response).is_empty());
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "isLoggedIn": false })
    );
}

#[tokio::test]
async fn test_check_auth_after_logout() {
    let app = create_test_app().await;
    register_and_login(&app, "alice", "alice@example.com").await;

    let response = app.send(request("POST", "/api/auth/logout", None)).await;
    let cleared = extract_set_cookies(&response);

    // What the browser sends after applying the cleared cookies: nothing
    let remaining: Vec<_> = cleared
        .iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .collect();
    assert!(remaining.is_empty());

    let response = app
        .send(request("GET", "/api/auth/check-auth", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["isLoggedIn"], false);
}
