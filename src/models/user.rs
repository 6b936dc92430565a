//! User model - local (email+password) and federated accounts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider tag for locally-registered accounts.
pub const EMAIL_PROVIDER: &str = "email";

/// Role codes carried in access-token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
    Staff,
    Guest,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
            UserRole::Staff => "STAFF",
            UserRole::Guest => "GUEST",
        }
    }

    /// Parse a stored role code; unknown codes degrade to the least
    /// privileged role.
    pub fn parse(code: &str) -> Self {
        match code {
            "ADMIN" => UserRole::Admin,
            "STAFF" => UserRole::Staff,
            "USER" => UserRole::User,
            _ => UserRole::Guest,
        }
    }
}

/// User entity.
///
/// `id` is provider-assigned for federated users and generated locally for
/// email accounts. `password` holds an argon2 hash and is only meaningful
/// when `provider == "email"`.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub provider: String,
    pub role: UserRole,
    pub tos: bool,
}

impl User {
    /// Create a local account from a registration request.
    pub fn new_local(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password: Some(password_hash),
            provider: EMAIL_PROVIDER.to_string(),
            role: UserRole::User,
            tos: false,
        }
    }

    /// Create a federated account from an incoming provider identity.
    pub fn new_federated(id: String, name: String, email: String, provider: String) -> Self {
        Self {
            id,
            name,
            email,
            password: None,
            provider,
            role: UserRole::User,
            tos: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_codes_round_trip() {
        for role in [
            UserRole::User,
            UserRole::Admin,
            UserRole::Staff,
            UserRole::Guest,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), role);
        }
    }

    #[test]
    fn unknown_role_degrades_to_guest() {
        assert_eq!(UserRole::parse("SUPERUSER"), UserRole::Guest);
    }
}
