pub mod store;

// Re-export so code outside can do "use crate::store::SessionStore;"
pub use store::SessionStore;
