use serde::{Deserialize, Serialize};

use crate::services::AccessClaims;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A pending two-factor challenge. The code itself travels by email.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge_token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub challenge_token: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyResetQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Repeatable `scope` query parameters on the OAuth begin redirect.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthBeginQuery {
    #[serde(default)]
    pub scope: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}

/// The signed-in identity, as seen by the frontend.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub provider: String,
    pub role: String,
}

impl SessionResponse {
    pub fn new(session_id: impl Into<String>, claims: AccessClaims) -> Self {
        SessionResponse {
            session_id: session_id.into(),
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            provider: claims.provider,
            role: claims.role,
        }
    }
}
