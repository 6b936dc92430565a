mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use facilities_auth::config::{
    AuthConfig, Environment, MicrosoftConfig, OAuthClientConfig, SmtpConfig,
};
use facilities_auth::services::{
    AuthOrchestrator, CapturingEmailSender, ChallengeStore, ProviderRegistry, TokenIssuer,
};
use facilities_auth::{build_router, AppState};

use common::{extract_code, MemoryStore};

struct TestApp {
    router: Router,
    email: Arc<CapturingEmailSender>,
}

fn test_config() -> AuthConfig {
    AuthConfig {
        environment: Environment::Dev,
        service_name: "facilities-auth".to_string(),
        log_level: "info".to_string(),
        port: 8080,
        database_url: String::new(),
        auth_secret: "test-secret".to_string(),
        auth_salt: "test-salt-01".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
        host: "http://localhost:8080".to_string(),
        default_provider: "microsoft".to_string(),
        janitor_interval_seconds: 3600,
        allowed_origins: vec!["http://localhost:3000".to_string()],
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            user: String::new(),
            password: String::new(),
            from: "no-reply@localhost".to_string(),
        },
        google: OAuthClientConfig {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
        },
        microsoft: MicrosoftConfig {
            client_id: String::new(),
            client_secret: String::new(),
            tenant_id: "common".to_string(),
            redirect_uri: String::new(),
        },
    }
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let tokens = Arc::new(TokenIssuer::new("test-secret", "test-salt-01").expect("issuer"));
    let email = Arc::new(CapturingEmailSender::new());

    let auth = Arc::new(AuthOrchestrator::new(
        store.clone(),
        tokens.clone(),
        Arc::new(ChallengeStore::new()),
        Arc::new(ProviderRegistry::new()),
        email.clone(),
        "microsoft".to_string(),
        "http://localhost:3000".to_string(),
    ));

    let state = AppState {
        config: Arc::new(test_config()),
        auth,
        tokens,
        store,
    };

    TestApp {
        router: build_router(state),
        email,
    }
}

async fn post_json(router: &Router, uri: &str, body: Value) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn get_with_cookies(router: &Router, uri: &str, cookies: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::COOKIE, cookies)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("cookie header").to_string())
        .collect()
}

fn cookie_header(cookies: &[String], name: &str) -> String {
    cookies
        .iter()
        .find(|c| c.starts_with(&format!("{name}=")))
        .unwrap_or_else(|| panic!("no {name} cookie in {cookies:?}"))
        .clone()
}

fn cookie_value(cookies: &[String], name: &str) -> String {
    let header = cookie_header(cookies, name);
    let pair = header.split(';').next().expect("name=value");
    pair.split_once('=').expect("value").1.to_string()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Drive register + verify over HTTP, returning the verify response.
async fn sign_up(app: &TestApp) -> Response<Body> {
    let response = post_json(
        &app.router,
        "/auth/register",
        json!({
            "name": "Pat Doe",
            "email": "pat@example.com",
            "password": "hunter2hunter2",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let challenge_token = json_body(response).await["challenge_token"]
        .as_str()
        .expect("challenge token")
        .to_string();
    let code = extract_code(&app.email.last().expect("verification email").body);

    post_json(
        &app.router,
        "/auth/verify",
        json!({ "challenge_token": challenge_token, "code": code }),
    )
    .await
}

#[tokio::test]
async fn sign_in_sets_cookies_with_expected_lifetimes() {
    let app = test_app();
    let response = sign_up(&app).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);

    // Access token and csrf cookie share the 8-hour token life.
    let token = cookie_header(&cookies, "__fa_token");
    assert!(token.contains("Max-Age=28800"), "{token}");
    assert!(token.contains("HttpOnly"), "{token}");

    let csrf = cookie_header(&cookies, "csrf-token");
    assert!(csrf.contains("Max-Age=28800"), "{csrf}");
    assert!(!csrf.contains("HttpOnly"), "{csrf}");

    // The session cookie lasts the session's 14 days.
    let session = cookie_header(&cookies, "__fa_session");
    assert!(session.contains("Max-Age=1209600"), "{session}");
    assert!(session.contains("HttpOnly"), "{session}");
}

#[tokio::test]
async fn session_introspection_reports_the_session_id() {
    let app = test_app();
    let response = sign_up(&app).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    let token = cookie_value(&cookies, "__fa_token");
    let session_id = cookie_value(&cookies, "__fa_session");

    let verify_body = json_body(response).await;
    assert_eq!(verify_body["session_id"], session_id.as_str());

    let response = get_with_cookies(
        &app.router,
        "/auth/session",
        &format!("__fa_token={token}; __fa_session={session_id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["email"], "pat@example.com");
    assert_eq!(body["provider"], "email");
}

#[tokio::test]
async fn session_introspection_requires_a_token() {
    let app = test_app();

    let response = get_with_cookies(&app.router, "/auth/session", "__fa_session=whatever").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
