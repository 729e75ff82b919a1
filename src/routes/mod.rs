//! Navigation gating.
//!
//! Screens that require a session ask the guard before rendering; the guard
//! only reads the session store and never triggers authentication itself.

pub mod guard;

pub use guard::{can_enter, GuardDecision, RouteGuard};
