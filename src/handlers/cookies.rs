use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::config::AuthConfig;
use crate::models::SESSION_TTL_DAYS;
use crate::services::{AuthTokens, ACCESS_TOKEN_TTL_HOURS};
use crate::utils::generate_random_id;

/// A state nonce only has to survive the provider round trip.
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;

pub fn token_cookie_name(config: &AuthConfig) -> String {
    format!("{}fa_token", config.cookie_prefix())
}

pub fn session_cookie_name(config: &AuthConfig) -> String {
    format!("{}fa_session", config.cookie_prefix())
}

pub fn state_cookie_name(provider: &str) -> String {
    format!("oauth_state_{provider}")
}

// Cookies are scoped by path only; the Domain attribute stays unset so
// they bind to the exact host that issued them.
fn base_cookie(name: String, value: String, config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(config.secure())
        .same_site(SameSite::Lax)
        .build()
}

/// Install the access-token, session and CSRF cookies after a completed
/// sign-in or refresh.
pub fn with_auth_cookies(jar: CookieJar, config: &AuthConfig, tokens: &AuthTokens) -> CookieJar {
    let mut token = base_cookie(
        token_cookie_name(config),
        tokens.access_token.clone(),
        config,
    );
    token.set_max_age(Duration::hours(ACCESS_TOKEN_TTL_HOURS));

    let mut session = base_cookie(
        session_cookie_name(config),
        tokens.session.id.clone(),
        config,
    );
    session.set_max_age(Duration::days(SESSION_TTL_DAYS));

    // Readable by frontend code, so not HttpOnly. Lives as long as the
    // access token; a refresh reissues it.
    let csrf = Cookie::build(("csrf-token", generate_random_id()))
        .path("/")
        .secure(config.secure())
        .same_site(SameSite::Strict)
        .max_age(Duration::hours(ACCESS_TOKEN_TTL_HOURS))
        .build();

    jar.add(token).add(session).add(csrf)
}

/// Short-lived per-provider nonce cookie set before redirecting out.
pub fn with_state_cookie(
    jar: CookieJar,
    config: &AuthConfig,
    provider: &str,
    state: &str,
) -> CookieJar {
    let mut cookie = base_cookie(state_cookie_name(provider), state.to_string(), config);
    cookie.set_max_age(Duration::minutes(OAUTH_STATE_TTL_MINUTES));
    jar.add(cookie)
}

pub fn remove_state_cookie(jar: CookieJar, provider: &str) -> CookieJar {
    jar.remove(Cookie::build(state_cookie_name(provider)).path("/").build())
}

pub fn clear_auth_cookies(jar: CookieJar, config: &AuthConfig) -> CookieJar {
    jar.remove(Cookie::build(token_cookie_name(config)).path("/").build())
        .remove(Cookie::build(session_cookie_name(config)).path("/").build())
        .remove(Cookie::build("csrf-token").path("/").build())
}
