//! The four session transitions: login, register, logout and silent refresh.
//!
//! Network-backed operations are serialised through an async mutex, so at most
//! one of them is pending at a time and a second call queues behind the first.
//! A login/register takes a ticket from the epoch counter once it holds the
//! mutex, and logout advances the counter; a result is applied only if its
//! ticket is still current when it arrives. The check and the store update
//! happen under the epoch lock, so a logout always wins over a success that
//! completes after it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Duration;
use tracing::{debug, info, warn};

use super::refresh_gate::{RefreshGate, RefreshOutcome};
use super::validation::{validate_login, validate_registration};
use crate::api::AuthApi;
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::models::{AccessToken, Credentials, Identity, Session};
use crate::store::SessionStore;

/// Marks the session pending for as long as it lives.
///
/// Dropping it clears the flag, including when the owning future is dropped
/// part-way through.
struct PendingScope<'a> {
    store: &'a SessionStore,
}

impl<'a> PendingScope<'a> {
    fn begin(store: &'a SessionStore) -> Self {
        store.update(|s| s.clone().with_error(None).with_pending(true));
        PendingScope { store }
    }
}

impl Drop for PendingScope<'_> {
    fn drop(&mut self) {
        self.store.update(|s| s.clone().with_pending(false));
    }
}

#[derive(Default)]
struct Epoch {
    /// Advanced when a login/register starts its request, and by logout.
    current: u64,
    /// Advanced by logout only.
    logouts: u64,
}

struct Inner {
    api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    config: SessionConfig,
    gate: RefreshGate,
    /// Serialises network-backed operations.
    operation: tokio::sync::Mutex<()>,
    epoch: Mutex<Epoch>,
}

impl Inner {
    fn epoch(&self) -> MutexGuard<'_, Epoch> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn logouts(&self) -> u64 {
        self.epoch().logouts
    }

    fn current_ticket(&self) -> u64 {
        self.epoch().current
    }

    /// Ticket for an attempt requested after `logouts_seen` logouts, or
    /// `None` if the user has logged out since.
    fn start_attempt(&self, logouts_seen: u64) -> Option<u64> {
        let mut epoch = self.epoch();
        if epoch.logouts != logouts_seen {
            return None;
        }
        epoch.current += 1;
        Some(epoch.current)
    }

    /// Installs `f(current)` only if `ticket` is still the latest attempt.
    fn apply_if_current<F>(&self, ticket: u64, f: F) -> bool
    where
        F: FnOnce(&Session) -> Session,
    {
        let epoch = self.epoch();
        if epoch.current != ticket {
            return false;
        }
        self.store.update(f);
        true
    }

    async fn login_with(&self, ticket: u64, credentials: &Credentials) -> Result<(), AuthError> {
        info!("Logging in '{}'", credentials.email);
        match self.api.login(credentials).await {
            Ok(token) => {
                let identity = Identity::from_login(&credentials.email, &token);
                let applied = self.apply_if_current(ticket, |s| {
                    Session::authenticated(token, identity).with_pending(s.is_pending())
                });
                if applied {
                    info!("Session established for '{}'", credentials.email);
                    Ok(())
                } else {
                    warn!(
                        "Discarding login result for '{}': session changed while it was in flight",
                        credentials.email
                    );
                    // The response may have planted a refresh credential after logout dropped ours.
                    self.api.forget_credential();
                    Err(AuthError::Superseded)
                }
            }
            Err(err) => {
                warn!("Login failed for '{}': {}", credentials.email, err);
                let applied = self.apply_if_current(ticket, |s| {
                    Session::unauthenticated()
                        .with_error(Some(err.to_string()))
                        .with_pending(s.is_pending())
                });
                if applied {
                    Err(err)
                } else {
                    Err(AuthError::Superseded)
                }
            }
        }
    }

    async fn register_with(&self, ticket: u64, credentials: &Credentials) -> Result<(), AuthError> {
        info!("Registering '{}'", credentials.email);
        match self.api.signup(credentials).await {
            Ok(()) => self.login_with(ticket, credentials).await,
            Err(err) => {
                warn!("Registration failed for '{}': {}", credentials.email, err);
                let applied =
                    self.apply_if_current(ticket, |s| s.clone().with_error(Some(err.to_string())));
                if applied {
                    Err(err)
                } else {
                    Err(AuthError::Superseded)
                }
            }
        }
    }

    async fn refresh_with(&self, ticket: u64) -> RefreshOutcome {
        let _operation = self.operation.lock().await;
        let outcome = {
            let _pending = PendingScope::begin(&self.store);
            let outcome = self.api.refresh().await;
            self.apply_refresh(ticket, outcome)
        };
        match &outcome {
            Ok(_) => info!("Session refreshed"),
            Err(err) => debug!("Silent refresh did not produce a session: {}", err),
        }
        outcome
    }

    /// Refresh failures never set `last_error`: having no prior session is
    /// the normal state for a first visit.
    fn apply_refresh(&self, ticket: u64, outcome: RefreshOutcome) -> RefreshOutcome {
        let epoch = self.epoch();
        if epoch.current != ticket {
            // A newer transition owns the session; only make sure it is resolved.
            self.store.update(|s| {
                if s.is_resolved() {
                    s.clone()
                } else {
                    Session::unauthenticated().with_pending(s.is_pending())
                }
            });
            drop(epoch);
            if outcome.is_ok() {
                // A rotated refresh credential must not outlive the logout.
                self.api.forget_credential();
            }
            return Err(AuthError::Superseded);
        }

        self.store.update(|s| match &outcome {
            Ok(token) => {
                let identity = Identity::after_refresh(s.identity(), token);
                Session::authenticated(token.clone(), identity).with_pending(s.is_pending())
            }
            Err(err) if err.invalidates_credential() || !s.is_resolved() => {
                Session::unauthenticated().with_pending(s.is_pending())
            }
            // Transport trouble does not prove the current token is bad.
            Err(_) => s.clone(),
        });
        outcome
    }
}

/// Owns the session transitions. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<SessionStore>, config: SessionConfig) -> Self {
        info!("Creating session manager backed by '{}'", api.get_name());
        SessionManager {
            inner: Arc::new(Inner {
                api,
                store,
                config,
                gate: RefreshGate::new(),
                operation: tokio::sync::Mutex::new(()),
                epoch: Mutex::new(Epoch::default()),
            }),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    /// Current session snapshot.
    pub fn session(&self) -> Session {
        self.inner.store.read()
    }

    /// Current access token, for attaching to downstream requests.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner.store.read().access_token().cloned()
    }

    /// Window before expiry in which a token is refreshed ahead of use.
    pub fn refresh_skew(&self) -> Duration {
        Duration::seconds(self.inner.config.refresh_skew_in_secs)
    }

    /// Startup hook: one silent refresh while the session is unresolved.
    pub async fn initialize(&self) -> Session {
        if !self.inner.store.read().is_resolved() {
            // Failure is the expected outcome for a first visit.
            let _ = self.silent_refresh().await;
        }
        self.inner.store.resolved().await
    }

    /// Authenticate with email and password.
    ///
    /// Blank fields fail with `Validation` before any request is made and
    /// leave the session untouched. Server and network failures reset the
    /// session to `Unauthenticated` with the message in `last_error`.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let credentials = validate_login(email, password)?;
        let logouts_seen = self.inner.logouts();
        let _operation = self.inner.operation.lock().await;
        let Some(ticket) = self.inner.start_attempt(logouts_seen) else {
            debug!("Login for '{}' cancelled by logout while queued", credentials.email);
            return Err(AuthError::Superseded);
        };

        let outcome = {
            let _pending = PendingScope::begin(&self.inner.store);
            self.inner.login_with(ticket, &credentials).await
        };
        outcome.map(|()| self.inner.store.read())
    }

    /// Create an account, then log in with the same credentials.
    ///
    /// The pending flag spans both requests. If account creation fails the
    /// login is not attempted.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let credentials =
            validate_registration(email, password, self.inner.config.password_min_length)?;
        let logouts_seen = self.inner.logouts();
        let _operation = self.inner.operation.lock().await;
        let Some(ticket) = self.inner.start_attempt(logouts_seen) else {
            debug!("Registration for '{}' cancelled by logout while queued", credentials.email);
            return Err(AuthError::Superseded);
        };

        let outcome = {
            let _pending = PendingScope::begin(&self.inner.store);
            self.inner.register_with(ticket, &credentials).await
        };
        outcome.map(|()| self.inner.store.read())
    }

    /// Drop the session immediately.
    ///
    /// Any attempt still in flight is invalidated. The local refresh
    /// credential is forgotten and, when a runtime is available, the server is
    /// told in the background; that notification cannot affect local state.
    pub fn logout(&self) -> Session {
        {
            let mut epoch = self.inner.epoch();
            epoch.current += 1;
            epoch.logouts += 1;
            self.inner
                .store
                .update(|s| Session::unauthenticated().with_pending(s.is_pending()));
        }
        self.inner.api.forget_credential();
        info!("Logged out");
        self.notify_logout();
        self.inner.store.read()
    }

    fn notify_logout(&self) {
        let api = self.inner.api.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = api.logout().await {
                        warn!("Ignoring failed logout notification: {}", err);
                    }
                });
            }
            Err(_) => debug!("No async runtime; skipping logout notification"),
        }
    }

    /// Try to obtain a token from the refresh credential.
    ///
    /// Concurrent callers share a single request. Failures are returned for
    /// the caller's information but never populate `last_error`.
    pub async fn silent_refresh(&self) -> RefreshOutcome {
        let inner = self.inner.clone();
        self.inner
            .gate
            .refresh(move || {
                let ticket = inner.current_ticket();
                async move { inner.refresh_with(ticket).await }
            })
            .await
    }

    /// Whether a refresh request is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.gate.is_in_flight()
    }
}
