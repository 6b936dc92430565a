use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use jsonwebtoken::errors::ErrorKind;
use tracing::debug;

use crate::error::AppError;
use crate::handlers::cookies;
use crate::AppState;

/// Session id riding along with an authenticated request, for
/// introspection handlers.
#[derive(Debug, Clone)]
pub struct SessionContext(pub String);

/// Require a signed-in caller.
///
/// A valid access token passes straight through with its claims attached
/// to the request. An expired token is refreshed transparently from the
/// session cookie, and the rotated cookies ride out on the response.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(&cookies::token_cookie_name(&state.config))
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("missing access token")))?;

    match state.tokens.verify(&token) {
        Ok(claims) => {
            let session_id = jar
                .get(&cookies::session_cookie_name(&state.config))
                .map(|c| c.value().to_string())
                .unwrap_or_default();
            request.extensions_mut().insert(SessionContext(session_id));
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            let session_id = jar
                .get(&cookies::session_cookie_name(&state.config))
                .map(|c| c.value().to_string())
                .ok_or_else(|| {
                    AppError::Unauthorized(anyhow::anyhow!("expired token without session"))
                })?;

            debug!("access token expired, refreshing from session");
            let tokens = state.auth.refresh(&session_id).await?;
            let claims = state.tokens.verify(&tokens.access_token).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("freshly signed token invalid: {e}"))
            })?;

            request
                .extensions_mut()
                .insert(SessionContext(tokens.session.id.clone()));
            request.extensions_mut().insert(claims);
            let response = next.run(request).await;
            let jar = cookies::with_auth_cookies(jar, &state.config, &tokens);
            Ok((jar, response).into_response())
        }
        Err(_) => Err(AppError::Unauthorized(anyhow::anyhow!(
            "invalid access token"
        ))),
    }
}
