use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::services::ServiceError;
use crate::utils::{generate_random_id, generate_six_digit_code};

/// A mailed code expires after five minutes.
pub const CHALLENGE_TTL_MINUTES: i64 = 5;
/// A reset link stays valid a little longer than a mailed code.
pub const RESET_TTL_MINUTES: i64 = 15;
/// Reads of a challenge, not just mismatches, count against this budget.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
struct Challenge {
    email: String,
    code: String,
    attempts: u32,
    expires_at: DateTime<Utc>,
}

/// Snapshot handed to the caller after a successful read.
#[derive(Debug, Clone)]
pub struct ChallengeAttempt {
    pub email: String,
    pub code: String,
}

/// In-memory store for pending two-factor codes and reset-link tokens,
/// keyed by an opaque token. Entries are removed lazily when a read finds
/// them expired or over budget, and in bulk by the janitor's sweep.
#[derive(Default)]
pub struct ChallengeStore {
    inner: Mutex<HashMap<String, Challenge>>,
}

impl ChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh challenge for `email` and return its opaque token
    /// together with the six-digit code to deliver out of band.
    pub fn issue_code(&self, email: &str, ttl: Duration) -> (String, String) {
        let code = generate_six_digit_code();
        let token = self.insert(email, code.clone(), ttl);
        (token, code)
    }

    /// Register a codeless challenge whose token itself is the secret,
    /// for links where nothing is mailed separately.
    pub fn issue_token(&self, email: &str, ttl: Duration) -> String {
        self.insert(email, String::new(), ttl)
    }

    fn insert(&self, email: &str, code: String, ttl: Duration) -> String {
        let token = generate_random_id();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(
            token.clone(),
            Challenge {
                email: email.to_string(),
                code,
                attempts: 0,
                expires_at: Utc::now() + ttl,
            },
        );
        token
    }

    /// Read the challenge behind `token`, spending one attempt.
    ///
    /// Unknown tokens, expired entries and entries past the attempt budget
    /// all fail as `Unauthenticated`; expired and exhausted entries are
    /// deleted on the way out.
    pub fn take_attempt(&self, token: &str) -> Result<ChallengeAttempt, ServiceError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        let challenge = inner.get_mut(token).ok_or(ServiceError::Unauthenticated)?;

        if challenge.expires_at <= Utc::now() {
            inner.remove(token);
            return Err(ServiceError::Unauthenticated);
        }

        challenge.attempts += 1;
        if challenge.attempts > MAX_ATTEMPTS {
            inner.remove(token);
            return Err(ServiceError::Unauthenticated);
        }

        Ok(ChallengeAttempt {
            email: challenge.email.clone(),
            code: challenge.code.clone(),
        })
    }

    /// Remove a challenge after a successful verification so the token
    /// cannot be replayed.
    pub fn consume(&self, token: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.remove(token);
    }

    /// Drop every expired challenge. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.len();
        inner.retain(|_, c| c.expires_at > now);
        before - inner.len()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_budget_counts_reads() {
        let store = ChallengeStore::new();
        let (token, code) = store.issue_code("pat@example.com", Duration::minutes(5));

        for _ in 0..MAX_ATTEMPTS {
            let attempt = store.take_attempt(&token).expect("within budget");
            assert_eq!(attempt.code, code);
        }

        // Fourth read fails even though the caller knows the right code.
        assert!(matches!(
            store.take_attempt(&token),
            Err(ServiceError::Unauthenticated)
        ));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn expired_challenge_is_deleted_on_read() {
        let store = ChallengeStore::new();
        let (token, _) = store.issue_code("pat@example.com", Duration::minutes(-1));

        assert!(matches!(
            store.take_attempt(&token),
            Err(ServiceError::Unauthenticated)
        ));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn consumed_challenge_cannot_be_replayed() {
        let store = ChallengeStore::new();
        let (token, _) = store.issue_code("pat@example.com", Duration::minutes(5));

        store.take_attempt(&token).expect("first read");
        store.consume(&token);

        assert!(matches!(
            store.take_attempt(&token),
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = ChallengeStore::new();
        assert!(matches!(
            store.take_attempt("no-such-token"),
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[test]
    fn codeless_challenge_carries_an_empty_code() {
        let store = ChallengeStore::new();
        let token = store.issue_token("pat@example.com", Duration::minutes(15));

        let attempt = store.take_attempt(&token).expect("read");
        assert_eq!(attempt.code, "");
        assert_eq!(attempt.email, "pat@example.com");
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let store = ChallengeStore::new();
        let (dead, _) = store.issue_code("old@example.com", Duration::minutes(-1));
        let (live, _) = store.issue_code("new@example.com", Duration::minutes(5));

        assert_eq!(store.sweep(), 1);
        assert!(store.take_attempt(&live).is_ok());
        assert!(store.take_attempt(&dead).is_err());
    }
}
