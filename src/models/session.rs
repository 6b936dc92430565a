//! Server-side session records.

use chrono::{DateTime, Duration, Utc};

use crate::utils::generate_random_id;

/// Absolute session lifetime. Sessions are deleted by the janitor once past
/// this horizon regardless of access-token activity.
pub const SESSION_TTL_DAYS: i64 = 14;

/// Session row binding a user to its current refresh material.
///
/// `refresh_token` is the identity provider's refresh token for federated
/// sessions, or a locally-signed token for the email provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub refresh_token: Option<String>,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: &str, refresh_token: Option<String>, provider: &str) -> Self {
        let now = Utc::now();
        Self {
            id: generate_random_id(),
            user_id: user_id.to_string(),
            refresh_token,
            provider: provider.to_string(),
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_expires_after_absolute_ttl() {
        let session = Session::new("user-1", None, "email");
        assert_eq!(
            session.expires_at - session.created_at,
            Duration::days(SESSION_TTL_DAYS)
        );
        assert!(!session.is_expired());
    }

    #[test]
    fn session_ids_are_unguessable_length() {
        let session = Session::new("user-1", None, "email");
        assert_eq!(session.id.len(), 32);
        assert_ne!(session.id, Session::new("user-1", None, "email").id);
    }
}
