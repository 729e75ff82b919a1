use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::RoutesConfig;
use crate::models::{Session, SessionStatus};
use crate::store::SessionStore;

const DEFAULT_LOGIN_PATH: &str = "/login";

/// Outcome of asking whether a protected screen may render.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    Redirect(String),
    /// The session is still being resolved; render a neutral placeholder.
    Defer,
}

impl GuardDecision {
    pub fn is_final(&self) -> bool {
        !matches!(self, GuardDecision::Defer)
    }
}

/// Decision for a protected screen under the default login path.
pub fn can_enter(session: &Session) -> GuardDecision {
    decide_protected(session, DEFAULT_LOGIN_PATH)
}

fn decide_protected(session: &Session, login_path: &str) -> GuardDecision {
    match session.status() {
        SessionStatus::Unresolved => GuardDecision::Defer,
        SessionStatus::Authenticated => GuardDecision::Allow,
        SessionStatus::Unauthenticated => GuardDecision::Redirect(login_path.to_string()),
    }
}

/// Path-aware guard built from the routes config.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
    home_path: String,
    public_paths: HashSet<String>,
}

impl RouteGuard {
    pub fn from_config(config: &RoutesConfig) -> Self {
        let mut public_paths: HashSet<String> = config
            .public_paths
            .iter()
            .map(|p| normalize(p))
            .collect();
        public_paths.insert(normalize(&config.login_path));
        RouteGuard {
            login_path: config.login_path.clone(),
            home_path: config.home_path.clone(),
            public_paths,
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.contains(&normalize(path))
    }

    /// Immediate decision for `path`; `Defer` while the session is unresolved.
    pub fn decide(&self, path: &str, session: &Session) -> GuardDecision {
        if self.is_public(path) {
            return GuardDecision::Allow;
        }
        decide_protected(session, &self.login_path)
    }

    /// Waits for the session to resolve, then decides. Never returns `Defer`.
    pub async fn enter(&self, path: &str, store: &SessionStore) -> GuardDecision {
        let immediate = self.decide(path, &store.read());
        if immediate.is_final() {
            return immediate;
        }
        debug!("Deferring '{}' until the session resolves", path);
        let session = store.resolved().await;
        self.decide(path, &session)
    }

    /// Where to navigate after authentication, if authenticated.
    pub fn landing(&self, session: &Session) -> Option<&str> {
        session.is_authenticated().then_some(self.home_path.as_str())
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::from_config(&RoutesConfig::default())
    }
}

/// `/login/` and `/login` are the same screen.
fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
