use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum_extra::extract::CookieJar;
use axum_extra::extract::Query as MultiQuery;
use tracing::warn;

use crate::dtos::{OAuthBeginQuery, OAuthCallbackQuery};
use crate::error::AppError;
use crate::handlers::cookies;
use crate::AppState;

/// Redirect the browser to the provider's consent screen, pinning the
/// state nonce in a short-lived cookie scoped to that provider.
pub async fn begin(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    MultiQuery(query): MultiQuery<OAuthBeginQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let (authorize_url, nonce) = state.auth.begin_oauth(&provider, &query.scope)?;
    let jar = cookies::with_state_cookie(jar, &state.config, &provider, &nonce);
    Ok((jar, Redirect::temporary(&authorize_url)))
}

/// Land the provider redirect, finish the exchange and sign the user in.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    if let Some(error) = query.error {
        warn!(
            provider = %provider,
            error = %error,
            description = query.error_description.as_deref().unwrap_or(""),
            "provider reported an authorization error"
        );
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "provider authorization failed"
        )));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("missing code parameter")))?;
    let callback_state = query
        .state
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("missing state parameter")))?;

    let cookie_state = jar
        .get(&cookies::state_cookie_name(&provider))
        .map(|c| c.value().to_string());

    let tokens = state
        .auth
        .oauth_callback(&provider, &code, &callback_state, cookie_state.as_deref())
        .await?;

    let jar = cookies::remove_state_cookie(jar, &provider);
    let jar = cookies::with_auth_cookies(jar, &state.config, &tokens);
    Ok((jar, Redirect::temporary(&state.config.frontend_url)))
}
