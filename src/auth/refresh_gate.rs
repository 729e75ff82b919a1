//! Single-slot coalescing of refresh attempts.
//!
//! The slot holds the in-flight attempt as a shared future. A caller that finds
//! the slot empty starts a new attempt and stores it; a caller that finds it
//! occupied awaits the stored one. The attempt empties its own slot as it
//! settles, so every waiter sees the same outcome and the next call starts
//! fresh.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::error::AuthError;
use crate::models::AccessToken;

pub type RefreshOutcome = Result<AccessToken, AuthError>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
pub struct RefreshGate {
    slot: Arc<Mutex<Option<(u64, InFlight)>>>,
    attempts: AtomicU64,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `start()` unless an attempt is already in flight, in which case
    /// the caller joins that attempt instead.
    pub async fn refresh<F, Fut>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let in_flight = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some((id, in_flight)) => {
                    debug!(attempt = id, "Joining in-flight refresh");
                    in_flight.clone()
                }
                None => {
                    let id = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(attempt = id, "Starting refresh");
                    let attempt = start();
                    let own_slot = self.slot.clone();
                    let in_flight = async move {
                        let outcome = attempt.await;
                        let mut slot = own_slot.lock().unwrap_or_else(PoisonError::into_inner);
                        if matches!(slot.as_ref(), Some((current, _)) if *current == id) {
                            *slot = None;
                        }
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some((id, in_flight.clone()));
                    in_flight
                }
            }
        };
        in_flight.await
    }

    /// Whether an attempt is currently in flight.
    pub fn is_in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of attempts started so far (joins are not counted).
    pub fn attempts_started(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}
