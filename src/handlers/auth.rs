use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;

use crate::dtos::{
    ChallengeResponse, LoginRequest, MessageResponse, RegisterRequest, RequestResetRequest,
    ResetPasswordRequest, SessionResponse, VerifyCodeRequest, VerifyResetQuery,
};
use crate::error::AppError;
use crate::handlers::cookies;
use crate::middleware::SessionContext;
use crate::services::AccessClaims;
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let pending = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(ChallengeResponse {
        challenge_token: pending.challenge_token,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ChallengeResponse>), AppError> {
    let pending = state
        .auth
        .register(&request.name, &request.email, &request.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ChallengeResponse {
            challenge_token: pending.challenge_token,
        }),
    ))
}

pub async fn verify_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let tokens = state
        .auth
        .verify_code(&request.challenge_token, &request.code)
        .await?;

    let claims = state
        .tokens
        .verify(&tokens.access_token)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("freshly signed token invalid: {e}")))?;

    let jar = cookies::with_auth_cookies(jar, &state.config, &tokens);
    Ok((jar, Json(SessionResponse::new(tokens.session.id, claims))))
}

pub async fn request_reset_password(
    State(state): State<AppState>,
    Json(request): Json<RequestResetRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.request_reset_password(&request.email).await?;
    Ok(Json(MessageResponse::new("reset email sent")))
}

pub async fn verify_reset_password(
    State(state): State<AppState>,
    Query(query): Query<VerifyResetQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.verify_reset_password(&query.token)?;
    Ok(Json(MessageResponse::new("reset token valid")))
}

/// Completing a reset signs the user straight in, so this sets the same
/// cookies as a verified login.
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let tokens = state
        .auth
        .reset_password(&request.token, &request.password)
        .await?;

    let claims = state
        .tokens
        .verify(&tokens.access_token)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("freshly signed token invalid: {e}")))?;

    let jar = cookies::with_auth_cookies(jar, &state.config, &tokens);
    Ok((jar, Json(SessionResponse::new(tokens.session.id, claims))))
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let session_id = jar
        .get(&cookies::session_cookie_name(&state.config))
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("missing session cookie")))?;

    let tokens = state.auth.refresh(&session_id).await?;
    let claims = state
        .tokens
        .verify(&tokens.access_token)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("freshly signed token invalid: {e}")))?;

    let jar = cookies::with_auth_cookies(jar, &state.config, &tokens);
    Ok((jar, Json(SessionResponse::new(tokens.session.id, claims))))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get(&cookies::session_cookie_name(&state.config)) {
        state.auth.logout(cookie.value()).await?;
    }
    let jar = cookies::clear_auth_cookies(jar, &state.config);
    Ok((jar, Json(MessageResponse::new("signed out"))))
}

/// Introspection of the signed-in identity, fed by the auth middleware.
pub async fn session(
    Extension(SessionContext(session_id)): Extension<SessionContext>,
    Extension(claims): Extension<AccessClaims>,
) -> Json<SessionResponse> {
    Json(SessionResponse::new(session_id, claims))
}
