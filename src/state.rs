//! Shared application state.
//!
//! Owns everything that lives as long as the page: the session store, the
//! manager that mutates it, the route guard and the authorized client. It is
//! built once at startup and cloned cheaply into every consumer.

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::client::AuthorizedClient;
use crate::config::ConfigV1;
use crate::routes::RouteGuard;
use crate::store::SessionStore;

#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Login, register, logout and silent refresh.
    pub session: SessionManager,
    /// Decides which screens may render.
    pub guard: Arc<RouteGuard>,
    /// HTTP client for downstream requests made as the signed-in user.
    pub client: AuthorizedClient,
}

impl AppState {
    pub fn store(&self) -> &Arc<SessionStore> {
        self.session.store()
    }
}
