pub mod auth;
pub mod challenge;
pub mod database;
pub mod email;
pub mod error;
pub mod provider;
pub mod session;
pub mod store;
pub mod token;

pub use auth::{AuthOrchestrator, AuthTokens, PendingChallenge, EXCHANGE_TIMEOUT};
pub use challenge::{ChallengeStore, CHALLENGE_TTL_MINUTES, MAX_ATTEMPTS, RESET_TTL_MINUTES};
pub use database::PostgresStore;
pub use email::{CapturingEmailSender, EmailSender, SmtpEmailSender};
pub use error::ServiceError;
pub use provider::{
    GoogleProvider, MicrosoftProvider, OAuthProvider, ProviderRegistry, ProviderTokens,
    ProviderUser,
};
pub use session::SessionStore;
pub use store::AuthStore;
pub use token::{AccessClaims, TokenIssuer, ACCESS_TOKEN_TTL_HOURS, REFRESH_TOKEN_TTL_DAYS};
