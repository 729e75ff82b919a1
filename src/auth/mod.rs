pub mod manager;
pub mod refresh_gate;
pub mod validation;

// Re-export from manager.rs so we can do "use crate::auth::*;"
pub use manager::SessionManager;
pub use refresh_gate::RefreshGate;
