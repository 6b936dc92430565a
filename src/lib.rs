pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;
pub mod workers;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{extract::State, Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::AuthConfig;
use crate::services::{AuthOrchestrator, AuthStore, TokenIssuer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthConfig>,
    pub auth: Arc<AuthOrchestrator>,
    pub tokens: Arc<TokenIssuer>,
    pub store: Arc<dyn AuthStore>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let protected = Router::new()
        .route("/auth/session", get(handlers::auth::session))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/verify", post(handlers::auth::verify_code))
        .route(
            "/auth/reset-password/request",
            post(handlers::auth::request_reset_password),
        )
        .route(
            "/auth/reset-password/verify",
            get(handlers::auth::verify_reset_password),
        )
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/oauth/:provider", get(handlers::oauth::begin))
        .route(
            "/auth/oauth/:provider/callback",
            get(handlers::oauth::callback),
        )
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &AuthConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
