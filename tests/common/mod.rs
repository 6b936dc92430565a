use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use facilities_auth::models::{Session, User};
use facilities_auth::services::{
    AuthOrchestrator, AuthStore, CapturingEmailSender, ChallengeStore, OAuthProvider,
    ProviderRegistry, ProviderTokens, ProviderUser, TokenIssuer,
};

/// In-memory implementation of the persistence port.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub fn session(&self, id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn seed_session(&self, session: Session) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), anyhow::Error> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.id) {
            anyhow::bail!("duplicate user id {}", user.id);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), anyhow::Error> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => anyhow::bail!("no user {}", user.id),
        }
    }

    async fn replace_user(&self, old_id: &str, user: &User) -> Result<(), anyhow::Error> {
        let mut users = self.users.lock().unwrap();
        if users.remove(old_id).is_none() {
            anyhow::bail!("no user {old_id}");
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn set_user_password(&self, id: &str, hash: &str) -> Result<(), anyhow::Error> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(id) {
            Some(user) => {
                user.password = Some(hash.to_string());
                Ok(())
            }
            None => anyhow::bail!("no user {id}"),
        }
    }

    async fn create_session(&self, session: &Session) -> Result<(), anyhow::Error> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, anyhow::Error> {
        Ok(self.sessions.lock().unwrap().get(id).cloned())
    }

    async fn update_session(&self, session: &Session) -> Result<(), anyhow::Error> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&session.id) {
            Some(existing) => {
                existing.refresh_token = session.refresh_token.clone();
                existing.expires_at = session.expires_at;
                Ok(())
            }
            None => anyhow::bail!("no session {}", session.id),
        }
    }

    async fn delete_session(&self, id: &str) -> Result<(), anyhow::Error> {
        self.sessions.lock().unwrap().remove(id);
        Ok(())
    }

    async fn delete_expired_sessions(&self) -> Result<u64, anyhow::Error> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        Ok((before - sessions.len()) as u64)
    }

    async fn ping(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Scriptable identity provider that counts its network-facing calls.
pub struct MockProvider {
    name: &'static str,
    pub profile: ProviderUser,
    /// Refresh token handed out on exchange and refresh. `None` models a
    /// provider that does not rotate refresh tokens.
    pub issued_refresh_token: Option<String>,
    /// Access-token lifetime the provider reports, in seconds.
    pub issued_expires_in: Option<i64>,
    pub fail_refresh: bool,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: &'static str, profile: ProviderUser) -> Self {
        MockProvider {
            name,
            profile,
            issued_refresh_token: Some(format!("{name}-refresh-token")),
            issued_expires_in: None,
            fail_refresh: false,
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OAuthProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn authorize_url(&self, state: &str, scopes: &[String]) -> String {
        format!(
            "https://idp.test/{}/authorize?state={state}&scope={}",
            self.name,
            scopes.join("+")
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderTokens, anyhow::Error> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if code == "bad-code" {
            anyhow::bail!("invalid authorization code");
        }
        Ok(ProviderTokens {
            access_token: format!("{}-access-token", self.name),
            refresh_token: self.issued_refresh_token.clone(),
            expires_in: self.issued_expires_in,
        })
    }

    async fn fetch_user(&self, _access_token: &str) -> Result<ProviderUser, anyhow::Error> {
        Ok(self.profile.clone())
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<ProviderTokens, anyhow::Error> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            anyhow::bail!("refresh token revoked");
        }
        Ok(ProviderTokens {
            access_token: format!("{}-refreshed-access-token", self.name),
            refresh_token: self.issued_refresh_token.clone(),
            expires_in: self.issued_expires_in,
        })
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub challenges: Arc<ChallengeStore>,
    pub providers: Arc<ProviderRegistry>,
    pub email: Arc<CapturingEmailSender>,
    pub tokens: Arc<TokenIssuer>,
    pub auth: AuthOrchestrator,
}

pub fn harness() -> Harness {
    harness_with_default_provider("microsoft")
}

pub fn harness_with_default_provider(default_provider: &str) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let challenges = Arc::new(ChallengeStore::new());
    let providers = Arc::new(ProviderRegistry::new());
    let email = Arc::new(CapturingEmailSender::new());
    let tokens = Arc::new(TokenIssuer::new("test-secret", "test-salt-01").expect("issuer"));

    let auth = AuthOrchestrator::new(
        store.clone(),
        tokens.clone(),
        challenges.clone(),
        providers.clone(),
        email.clone(),
        default_provider.to_string(),
        "http://localhost:3000".to_string(),
    );

    Harness {
        store,
        challenges,
        providers,
        email,
        tokens,
        auth,
    }
}

/// Pull the six-digit code out of a captured verification email.
pub fn extract_code(body: &str) -> String {
    let digits: Vec<char> = body.chars().collect();
    for window in digits.windows(6) {
        if window.iter().all(|c| c.is_ascii_digit()) {
            return window.iter().collect();
        }
    }
    panic!("no six-digit code in email body: {body}");
}
