use async_trait::async_trait;

use crate::models::{Session, User};

/// Persistence port for users and sessions.
///
/// Methods return `Ok(None)` for missing rows and reserve `Err` for
/// infrastructure failures, so callers decide what absence means.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, anyhow::Error>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error>;

    async fn create_user(&self, user: &User) -> Result<(), anyhow::Error>;

    /// Update the row matching `user.id`.
    async fn update_user(&self, user: &User) -> Result<(), anyhow::Error>;

    /// Re-key the row currently stored under `old_id` to `user`, updating
    /// its id and profile in one statement.
    async fn replace_user(&self, old_id: &str, user: &User) -> Result<(), anyhow::Error>;

    async fn set_user_password(&self, id: &str, hash: &str) -> Result<(), anyhow::Error>;

    async fn create_session(&self, session: &Session) -> Result<(), anyhow::Error>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, anyhow::Error>;

    /// Update the row matching `session.id`.
    async fn update_session(&self, session: &Session) -> Result<(), anyhow::Error>;

    async fn delete_session(&self, id: &str) -> Result<(), anyhow::Error>;

    /// Remove every session past its absolute expiry. Returns the count.
    async fn delete_expired_sessions(&self) -> Result<u64, anyhow::Error>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), anyhow::Error>;
}
