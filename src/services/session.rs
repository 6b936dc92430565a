use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::models::{Session, SESSION_TTL_DAYS};
use crate::services::{AuthStore, ServiceError};

/// Session lifecycle on top of the persistence port.
///
/// Sessions are opaque server-side records with an absolute expiry; a
/// session read past that expiry is deleted and reported as absent.
pub struct SessionStore {
    store: Arc<dyn AuthStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        SessionStore { store }
    }

    /// Mint and persist a new session for `user_id`.
    pub async fn create(
        &self,
        user_id: &str,
        refresh_token: Option<String>,
        provider: &str,
    ) -> Result<Session, ServiceError> {
        let session = Session::new(user_id, refresh_token, provider);
        self.store
            .create_session(&session)
            .await
            .map_err(ServiceError::Database)?;
        Ok(session)
    }

    /// Look up a live session. Expired rows are deleted on the way out and
    /// reported as if they never existed.
    pub async fn get(&self, id: &str) -> Result<Session, ServiceError> {
        let session = self
            .store
            .get_session(id)
            .await
            .map_err(ServiceError::Database)?
            .ok_or(ServiceError::NotFound("session"))?;

        if session.is_expired() {
            self.store
                .delete_session(id)
                .await
                .map_err(ServiceError::Database)?;
            return Err(ServiceError::NotFound("session"));
        }

        Ok(session)
    }

    /// Replace the refresh material on an existing session and push its
    /// absolute expiry out by another full lifetime.
    pub async fn rotate_refresh_token(
        &self,
        session: &mut Session,
        refresh_token: Option<String>,
    ) -> Result<(), ServiceError> {
        session.refresh_token = refresh_token;
        session.expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
        self.store
            .update_session(session)
            .await
            .map_err(ServiceError::Database)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.store
            .delete_session(id)
            .await
            .map_err(ServiceError::Database)
    }

    /// Bulk removal of expired sessions, used by the janitor.
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        self.store
            .delete_expired_sessions()
            .await
            .map_err(ServiceError::Database)
    }
}
