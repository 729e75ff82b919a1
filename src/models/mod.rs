pub mod credentials;
pub mod identity;
pub mod session;
pub mod token;

// Re-export the session data types so callers can "use crate::models::{Session, ...};"
pub use credentials::Credentials;
pub use identity::Identity;
pub use session::{Session, SessionStatus};
pub use token::AccessToken;
