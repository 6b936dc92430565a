pub mod auth;

pub use auth::{
    ChallengeResponse, LoginRequest, MessageResponse, OAuthBeginQuery, OAuthCallbackQuery,
    RegisterRequest, RequestResetRequest, ResetPasswordRequest, SessionResponse,
    VerifyCodeRequest, VerifyResetQuery,
};
