use thiserror::Error;

/// Error taxonomy for the auth core.
///
/// Bad credentials, unknown or exhausted challenges, bad OAuth state and
/// invalid refresh material all collapse into `Unauthenticated` so the
/// outward failure never reveals which check tripped.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error("email error: {0}")]
    Email(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
