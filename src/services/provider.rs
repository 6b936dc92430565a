use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{MicrosoftConfig, OAuthClientConfig};

/// Tokens returned by an identity provider's token endpoint.
#[derive(Debug, Clone)]
pub struct ProviderTokens {
    pub access_token: String,
    /// Providers may omit this on refresh; the caller keeps its old one.
    pub refresh_token: Option<String>,
    /// Reported access-token lifetime in seconds, when the provider sends one.
    pub expires_in: Option<i64>,
}

/// Profile fields we read from an identity provider.
#[derive(Debug, Clone)]
pub struct ProviderUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A federated identity provider.
///
/// Implementations own their endpoints and credentials; the orchestrator
/// only ever talks to this trait.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Authorization URL to redirect the browser to, carrying `state`.
    /// Extra scopes are appended to the provider's defaults.
    fn authorize_url(&self, state: &str, scopes: &[String]) -> String;

    /// Exchange an authorization code for tokens.
    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, anyhow::Error>;

    /// Fetch the signed-in user's profile with a provider access token.
    async fn fetch_user(&self, access_token: &str) -> Result<ProviderUser, anyhow::Error>;

    /// Trade a refresh token for fresh tokens.
    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, anyhow::Error>;
}

/// Registry of identity providers, keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn OAuthProvider>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, provider: Arc<dyn OAuthProvider>) {
        let mut providers = self.providers.write().unwrap_or_else(|e| e.into_inner());
        providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn OAuthProvider>> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl From<TokenResponse> for ProviderTokens {
    fn from(t: TokenResponse) -> Self {
        ProviderTokens {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_in: t.expires_in,
        }
    }
}

fn join_scopes(defaults: &str, extra: &[String]) -> String {
    let mut scopes: Vec<&str> = defaults.split(' ').collect();
    for scope in extra {
        if !scopes.contains(&scope.as_str()) {
            scopes.push(scope);
        }
    }
    scopes.join(" ")
}

/// Google OAuth 2.0 with OpenID Connect userinfo.
pub struct GoogleProvider {
    config: OAuthClientConfig,
    http: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(config: OAuthClientConfig, http: reqwest::Client) -> Self {
        GoogleProvider { config, http }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorize_url(&self, state: &str, scopes: &[String]) -> String {
        format!(
            "https://accounts.google.com/o/oauth2/v2/auth\
             ?client_id={}&redirect_uri={}&response_type=code\
             &scope={}&state={}&access_type=offline&prompt=consent",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&join_scopes("openid email profile", scopes)),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, anyhow::Error> {
        let response = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into())
    }

    async fn fetch_user(&self, access_token: &str) -> Result<ProviderUser, anyhow::Error> {
        #[derive(Deserialize)]
        struct UserInfo {
            sub: String,
            name: Option<String>,
            email: String,
        }

        let info: UserInfo = self
            .http
            .get("https://openidconnect.googleapis.com/v1/userinfo")
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(ProviderUser {
            id: info.sub,
            name: info.name.unwrap_or_else(|| info.email.clone()),
            email: info.email,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, anyhow::Error> {
        let response = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into())
    }
}

/// Microsoft Entra ID via the v2.0 endpoints and Graph profile lookup.
pub struct MicrosoftProvider {
    config: MicrosoftConfig,
    http: reqwest::Client,
}

impl MicrosoftProvider {
    pub fn new(config: MicrosoftConfig, http: reqwest::Client) -> Self {
        MicrosoftProvider { config, http }
    }

    fn token_endpoint(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.config.tenant_id
        )
    }
}

#[async_trait]
impl OAuthProvider for MicrosoftProvider {
    fn name(&self) -> &str {
        "microsoft"
    }

    fn authorize_url(&self, state: &str, scopes: &[String]) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize\
             ?client_id={}&redirect_uri={}&response_type=code\
             &scope={}&state={}",
            self.config.tenant_id,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&join_scopes(
                "openid email profile offline_access User.Read",
                scopes,
            )),
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, anyhow::Error> {
        let response = self
            .http
            .post(self.token_endpoint())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into())
    }

    async fn fetch_user(&self, access_token: &str) -> Result<ProviderUser, anyhow::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct GraphUser {
            id: String,
            display_name: Option<String>,
            mail: Option<String>,
            user_principal_name: String,
        }

        let user: GraphUser = self
            .http
            .get("https://graph.microsoft.com/v1.0/me")
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let email = user.mail.unwrap_or(user.user_principal_name);
        Ok(ProviderUser {
            id: user.id,
            name: user.display_name.unwrap_or_else(|| email.clone()),
            email,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, anyhow::Error> {
        let response = self
            .http
            .post(self.token_endpoint())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
                (
                    "scope",
                    "openid email profile offline_access User.Read",
                ),
            ])
            .send()
            .await?
            .error_for_status()?;

        let tokens: TokenResponse = response.json().await?;
        Ok(tokens.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google() -> Arc<dyn OAuthProvider> {
        Arc::new(GoogleProvider::new(
            OAuthClientConfig {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                redirect_uri: "http://localhost:8080/auth/oauth/google/callback".to_string(),
            },
            reqwest::Client::new(),
        ))
    }

    #[test]
    fn registry_returns_registered_providers() {
        let registry = ProviderRegistry::new();
        assert!(registry.get("google").is_none());

        registry.register(google());
        assert!(registry.get("google").is_some());
        assert!(registry.get("github").is_none());
        assert_eq!(registry.names(), vec!["google".to_string()]);
    }

    #[test]
    fn authorize_url_carries_state_and_redirect() {
        let url = google().authorize_url("nonce-123", &[]);
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("state=nonce-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(&urlencoding::encode(
            "http://localhost:8080/auth/oauth/google/callback"
        ).into_owned()));
    }
}
