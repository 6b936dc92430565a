pub mod session;
pub mod user;

pub use session::{Session, SESSION_TTL_DAYS};
pub use user::{User, UserRole, EMAIL_PROVIDER};
