use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::models::{Session, User, EMAIL_PROVIDER};
use crate::services::challenge::{CHALLENGE_TTL_MINUTES, RESET_TTL_MINUTES};
use crate::services::{
    AuthStore, ChallengeStore, EmailSender, ProviderRegistry, ProviderUser, ServiceError,
    SessionStore, TokenIssuer, ACCESS_TOKEN_TTL_HOURS,
};
use crate::utils::{generate_random_id, hash_password, verify_password, Password,
    PasswordHashString};

/// Budget for a provider round trip (code exchange plus profile fetch,
/// or a token refresh plus profile fetch).
pub const EXCHANGE_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Result of a completed sign-in or refresh: a signed access token and
/// the session backing it.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub session: Session,
}

/// Outcome of a credential login: a pending challenge the caller must
/// answer with the emailed code.
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub challenge_token: String,
}

/// Ties credentials, challenges, tokens, sessions and providers together
/// into the sign-in flows.
pub struct AuthOrchestrator {
    store: Arc<dyn AuthStore>,
    sessions: SessionStore,
    tokens: Arc<TokenIssuer>,
    challenges: Arc<ChallengeStore>,
    providers: Arc<ProviderRegistry>,
    email: Arc<dyn EmailSender>,
    default_provider: String,
    frontend_url: String,
}

impl AuthOrchestrator {
    pub fn new(
        store: Arc<dyn AuthStore>,
        tokens: Arc<TokenIssuer>,
        challenges: Arc<ChallengeStore>,
        providers: Arc<ProviderRegistry>,
        email: Arc<dyn EmailSender>,
        default_provider: String,
        frontend_url: String,
    ) -> Self {
        AuthOrchestrator {
            sessions: SessionStore::new(store.clone()),
            store,
            tokens,
            challenges,
            providers,
            email,
            default_provider,
            frontend_url,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Check credentials and, on success, open a two-factor challenge and
    /// email its code. The caller finishes sign-in with [`verify_code`].
    ///
    /// Unknown emails, federated-only accounts and bad passwords all fail
    /// the same way.
    ///
    /// [`verify_code`]: AuthOrchestrator::verify_code
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PendingChallenge, ServiceError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await
            .map_err(ServiceError::Database)?
            .ok_or(ServiceError::Unauthenticated)?;

        let hash = user
            .password
            .as_deref()
            .ok_or(ServiceError::Unauthenticated)?;

        verify_password(
            &Password::new(password.to_string()),
            &PasswordHashString::new(hash.to_string()),
        )
        .map_err(|_| ServiceError::Unauthenticated)?;

        self.open_challenge(&user).await
    }

    /// Create a local account and open its first sign-in challenge.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PendingChallenge, ServiceError> {
        if self
            .store
            .get_user_by_email(email)
            .await
            .map_err(ServiceError::Database)?
            .is_some()
        {
            return Err(ServiceError::AlreadyExists("account"));
        }

        let hash = hash_password(&Password::new(password.to_string()))?;
        let user = User::new_local(name.to_string(), email.to_string(), hash.into_string());
        self.store
            .create_user(&user)
            .await
            .map_err(ServiceError::Database)?;

        info!(user_id = %user.id, "registered local account");
        self.open_challenge(&user).await
    }

    async fn open_challenge(&self, user: &User) -> Result<PendingChallenge, ServiceError> {
        let (challenge_token, code) = self
            .challenges
            .issue_code(&user.email, Duration::minutes(CHALLENGE_TTL_MINUTES));

        self.send_mail(
            &user.email,
            "Your verification code",
            &format!(
                "Hi {},\n\nYour verification code is {code}. \
                 It expires in {CHALLENGE_TTL_MINUTES} minutes.\n",
                user.name
            ),
        )
        .await;

        Ok(PendingChallenge { challenge_token })
    }

    // Mail is fire-and-forget: delivery failures are logged, never
    // surfaced, so flows behave the same whether or not the relay is up.
    async fn send_mail(&self, to: &str, subject: &str, body: &str) {
        if let Err(e) = self.email.send(to, subject, body).await {
            warn!(error = %e, subject, "failed to deliver email");
        }
    }

    /// Answer a pending challenge. A correct code within the attempt
    /// budget consumes the challenge and opens a session.
    pub async fn verify_code(
        &self,
        challenge_token: &str,
        code: &str,
    ) -> Result<AuthTokens, ServiceError> {
        let attempt = self.challenges.take_attempt(challenge_token)?;

        if attempt.code != code {
            return Err(ServiceError::Unauthenticated);
        }
        self.challenges.consume(challenge_token);

        let user = self
            .store
            .get_user_by_email(&attempt.email)
            .await
            .map_err(ServiceError::Database)?
            .ok_or(ServiceError::Unauthenticated)?;

        let tokens = self.open_session(&user).await?;
        info!(user_id = %user.id, session_id = %tokens.session.id, "credential sign-in complete");
        Ok(tokens)
    }

    // A fresh session carries the access token itself as refresh
    // material; the first refresh swaps in a dedicated 14-day token.
    async fn open_session(&self, user: &User) -> Result<AuthTokens, ServiceError> {
        let access_token = self.tokens.issue_access_token(user)?;
        let session = self
            .sessions
            .create(&user.id, Some(access_token.clone()), EMAIL_PROVIDER)
            .await?;
        Ok(AuthTokens {
            access_token,
            session,
        })
    }

    /// Email a password-reset link carrying an opaque, attempt-limited
    /// token. Only local accounts can reset a password; federated accounts
    /// are reported as conflicts.
    pub async fn request_reset_password(&self, email: &str) -> Result<(), ServiceError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await
            .map_err(ServiceError::Database)?
            .ok_or(ServiceError::NotFound("account"))?;

        if user.provider != EMAIL_PROVIDER {
            return Err(ServiceError::AlreadyExists("federated account"));
        }

        let token = self
            .challenges
            .issue_token(&user.email, Duration::minutes(RESET_TTL_MINUTES));
        let link = format!(
            "{}/reset-password?token={}",
            self.frontend_url,
            urlencoding::encode(&token)
        );

        self.send_mail(
            &user.email,
            "Reset your password",
            &format!(
                "Hi {},\n\nFollow this link to reset your password:\n{link}\n\n\
                 The link expires in {RESET_TTL_MINUTES} minutes.\n",
                user.name
            ),
        )
        .await;

        Ok(())
    }

    /// Check that a reset link is still usable. This spends one of the
    /// token's attempts, like any other read.
    pub fn verify_reset_password(&self, token: &str) -> Result<(), ServiceError> {
        self.challenges.take_attempt(token).map(|_| ())
    }

    /// Set a new password on the account behind a live reset token and
    /// sign the user straight in.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<AuthTokens, ServiceError> {
        let attempt = self.challenges.take_attempt(token)?;

        let user = self
            .store
            .get_user_by_email(&attempt.email)
            .await
            .map_err(ServiceError::Database)?
            .ok_or(ServiceError::NotFound("account"))?;

        if user.provider != EMAIL_PROVIDER {
            return Err(ServiceError::AlreadyExists("federated account"));
        }

        let hash = hash_password(&Password::new(new_password.to_string()))?;
        self.store
            .set_user_password(&user.id, hash.as_str())
            .await
            .map_err(ServiceError::Database)?;
        self.challenges.consume(token);

        let tokens = self.open_session(&user).await?;
        info!(user_id = %user.id, "password reset, re-authenticated");
        Ok(tokens)
    }

    /// Start a federated sign-in: pick the provider, mint a state nonce
    /// and hand back the authorization URL to redirect to.
    pub fn begin_oauth(
        &self,
        provider_name: &str,
        scopes: &[String],
    ) -> Result<(String, String), ServiceError> {
        let provider = self
            .providers
            .get(provider_name)
            .ok_or(ServiceError::NotFound("provider"))?;

        let state = generate_random_id();
        Ok((provider.authorize_url(&state, scopes), state))
    }

    /// Finish a federated sign-in.
    ///
    /// The returned `state` must match the one stored in the caller's
    /// cookie before any provider traffic happens. The code exchange and
    /// profile fetch together get one network budget.
    pub async fn oauth_callback(
        &self,
        provider_name: &str,
        code: &str,
        state: &str,
        cookie_state: Option<&str>,
    ) -> Result<AuthTokens, ServiceError> {
        match cookie_state {
            Some(expected) if expected == state => {}
            _ => return Err(ServiceError::Unauthenticated),
        }

        let provider = self
            .providers
            .get(provider_name)
            .ok_or(ServiceError::NotFound("provider"))?;

        let (provider_tokens, profile) = timeout(EXCHANGE_TIMEOUT, async {
            let tokens = provider
                .exchange_code(code)
                .await
                .map_err(|e| {
                    warn!(provider = provider_name, error = %e, "code exchange failed");
                    ServiceError::Unauthenticated
                })?;
            let profile = provider
                .fetch_user(&tokens.access_token)
                .await
                .map_err(ServiceError::Internal)?;
            Ok::<_, ServiceError>((tokens, profile))
        })
        .await
        .map_err(|_| ServiceError::Internal(anyhow::anyhow!("provider exchange timed out")))??;

        let user = self.reconcile_user(provider_name, &profile).await?;

        let access_token = self
            .tokens
            .issue_access_token_with_ttl(&user, access_ttl(provider_tokens.expires_in))?;
        let session = self
            .sessions
            .create(&user.id, provider_tokens.refresh_token, provider_name)
            .await?;

        info!(user_id = %user.id, provider = provider_name, "federated sign-in complete");
        Ok(AuthTokens {
            access_token,
            session,
        })
    }

    /// Fold an incoming identity into the local account table.
    ///
    /// Match by id first, then by email (re-keying the row to the incoming
    /// id), and only then create a fresh account. A provider claiming an
    /// email already on file takes over that account's id; that is the
    /// intended way for a user to move between providers.
    async fn reconcile_user(
        &self,
        provider_name: &str,
        profile: &ProviderUser,
    ) -> Result<User, ServiceError> {
        if let Some(mut existing) = self
            .store
            .get_user_by_id(&profile.id)
            .await
            .map_err(ServiceError::Database)?
        {
            if existing.name != profile.name
                || existing.email != profile.email
                || existing.provider != provider_name
            {
                existing.name = profile.name.clone();
                existing.email = profile.email.clone();
                existing.provider = provider_name.to_string();
                self.store
                    .update_user(&existing)
                    .await
                    .map_err(ServiceError::Database)?;
            }
            return Ok(existing);
        }

        if let Some(existing) = self
            .store
            .get_user_by_email(&profile.email)
            .await
            .map_err(ServiceError::Database)?
        {
            let mut rekeyed = existing.clone();
            rekeyed.id = profile.id.clone();
            rekeyed.name = profile.name.clone();
            rekeyed.provider = provider_name.to_string();
            self.store
                .replace_user(&existing.id, &rekeyed)
                .await
                .map_err(ServiceError::Database)?;
            return Ok(rekeyed);
        }

        let user = User::new_federated(
            profile.id.clone(),
            profile.name.clone(),
            profile.email.clone(),
            provider_name.to_string(),
        );
        self.store
            .create_user(&user)
            .await
            .map_err(ServiceError::Database)?;
        info!(user_id = %user.id, provider = provider_name, "created federated account");
        Ok(user)
    }

    /// Mint a fresh access token for an existing session.
    ///
    /// Local sessions rotate their locally signed refresh material and
    /// extend their expiry; federated sessions go back to their provider
    /// and only extend when the provider hands out new refresh material.
    pub async fn refresh(&self, session_id: &str) -> Result<AuthTokens, ServiceError> {
        let mut session = match self.sessions.get(session_id).await {
            Ok(session) => session,
            Err(ServiceError::NotFound(_)) => return Err(ServiceError::Unauthenticated),
            Err(e) => return Err(e),
        };

        let stored = session
            .refresh_token
            .clone()
            .ok_or(ServiceError::Unauthenticated)?;

        if session.provider == EMAIL_PROVIDER {
            let claims = self
                .tokens
                .verify(&stored)
                .map_err(|_| ServiceError::Unauthenticated)?;

            let identity = ProviderUser {
                id: claims.sub,
                name: claims.name,
                email: claims.email,
            };
            let user = self.reconcile_user(EMAIL_PROVIDER, &identity).await?;

            let access_token = self.tokens.issue_access_token(&user)?;
            let refresh_token = self.tokens.issue_refresh_token(&user)?;
            self.sessions
                .rotate_refresh_token(&mut session, Some(refresh_token))
                .await?;

            return Ok(AuthTokens {
                access_token,
                session,
            });
        }

        let provider = match self.providers.get(&session.provider) {
            Some(provider) => provider,
            None => {
                warn!(
                    provider = %session.provider,
                    fallback = %self.default_provider,
                    "session names an unregistered provider, falling back"
                );
                self.providers
                    .get(&self.default_provider)
                    .ok_or_else(|| {
                        ServiceError::Internal(anyhow::anyhow!(
                            "default provider {} is not registered",
                            self.default_provider
                        ))
                    })?
            }
        };

        let (provider_tokens, profile) = timeout(EXCHANGE_TIMEOUT, async {
            let tokens = provider.refresh(&stored).await.map_err(|e| {
                warn!(provider = %session.provider, error = %e, "provider refresh failed");
                ServiceError::Unauthenticated
            })?;
            let profile = provider
                .fetch_user(&tokens.access_token)
                .await
                .map_err(ServiceError::Internal)?;
            Ok::<_, ServiceError>((tokens, profile))
        })
        .await
        .map_err(|_| ServiceError::Internal(anyhow::anyhow!("provider refresh timed out")))??;

        let user = self.reconcile_user(provider.name(), &profile).await?;

        let access_token = self
            .tokens
            .issue_access_token_with_ttl(&user, access_ttl(provider_tokens.expires_in))?;

        // Without new refresh material the old token stays in place and
        // the session keeps its current expiry.
        if provider_tokens.refresh_token.is_some() {
            self.sessions
                .rotate_refresh_token(&mut session, provider_tokens.refresh_token)
                .await?;
        }

        Ok(AuthTokens {
            access_token,
            session,
        })
    }

    /// Tear down a session. Unknown sessions are fine to log out of.
    pub async fn logout(&self, session_id: &str) -> Result<(), ServiceError> {
        self.sessions.delete(session_id).await
    }
}

fn access_ttl(expires_in: Option<i64>) -> Duration {
    match expires_in {
        Some(seconds) if seconds > 0 => Duration::seconds(seconds),
        _ => Duration::hours(ACCESS_TOKEN_TTL_HOURS),
    }
}
