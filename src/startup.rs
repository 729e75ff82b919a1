//! Application startup.
//!
//! Builds the [`AppState`] from configuration, resolves the session through a
//! single silent refresh and reports the guard decision for each requested
//! path.

use std::sync::Arc;

use tracing::info;

use crate::api::create_auth_api;
use crate::auth::SessionManager;
use crate::client::AuthorizedClient;
use crate::config::ConfigV1;
use crate::error::AuthError;
use crate::routes::{GuardDecision, RouteGuard};
use crate::state::AppState;
use crate::store::SessionStore;

/// Wires the store, manager, guard and client together. Performs no I/O.
pub fn build_state(config: Arc<ConfigV1>) -> Result<AppState, AuthError> {
    let api = create_auth_api(&config.api)?;
    let store = Arc::new(SessionStore::new());
    let session = SessionManager::new(api, store, config.session.clone());
    let client = AuthorizedClient::new(session.clone(), &config.api)?;
    let guard = Arc::new(RouteGuard::from_config(&config.routes));

    Ok(AppState {
        config,
        session,
        guard,
        client,
    })
}

/// Resolves the session and decides each of `paths`.
///
/// Returns the decisions in input order.
pub async fn run(
    config: Arc<ConfigV1>,
    paths: &[String],
) -> Result<Vec<(String, GuardDecision)>, Box<dyn std::error::Error>> {
    let state = build_state(config)?;

    info!("Resolving session against {}", state.config.api.base_url);
    let session = state.session.initialize().await;
    info!(status = ?session.status(), "Session resolved");
    if let Some(home) = state.guard.landing(&session) {
        info!("Authenticated, landing on {}", home);
    }

    let mut decisions = Vec::with_capacity(paths.len());
    for path in paths {
        let decision = state.guard.enter(path, state.store()).await;
        info!(?decision, "Route decision for '{}'", path);
        decisions.push((path.clone(), decision));
    }
    Ok(decisions)
}
