//! In-memory owner of the current [`Session`].
//!
//! The store is the single source of truth for "is this client
//! authenticated". It never touches durable storage. Every mutation replaces
//! the whole snapshot and is broadcast to subscribers before the next read.

use tokio::sync::watch;
use tracing::debug;

use crate::models::{Session, SessionStatus};

pub struct SessionStore {
    tx: watch::Sender<Session>,
}

impl SessionStore {
    /// A store holding an `Unresolved` session.
    pub fn new() -> Self {
        Self::with_session(Session::unresolved())
    }

    pub fn with_session(session: Session) -> Self {
        let (tx, _rx) = watch::channel(session);
        SessionStore { tx }
    }

    /// Current snapshot. Never waits on I/O.
    pub fn read(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Derive the next snapshot from the current one in a single step.
    pub(crate) fn update<F>(&self, f: F)
    where
        F: FnOnce(&Session) -> Session,
    {
        self.tx.send_modify(|current| {
            let next = f(current);
            debug_assert!(next.is_consistent(), "inconsistent session: {:?}", next);
            debug!(status = ?next.status(), pending = next.is_pending(), "Session replaced");
            *current = next;
        });
    }

    /// Change notifications for consumers that render from the session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Waits until the session is no longer `Unresolved`.
    pub async fn resolved(&self) -> Session {
        let mut rx = self.tx.subscribe();
        let session = match rx
            .wait_for(|session| session.status() != SessionStatus::Unresolved)
            .await
        {
            Ok(session) => session.clone(),
            // The sender lives in `self`, so it cannot be gone here.
            Err(_) => self.read(),
        };
        session
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
