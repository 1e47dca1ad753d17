//! Single-flight coordination of access-token refreshes.
//!
//! The first caller to observe a 401 becomes the leader and performs the
//! refresh; everyone arriving while it runs gets a receiver on the same
//! one-slot channel and waits for the leader's outcome. The state check and
//! transition happen under a `std::sync::Mutex` that is never held across an
//! `.await`.

use crate::modules::error::ApiError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(String),
    Failed(String),
}

impl RefreshOutcome {
    pub fn into_result(self) -> Result<String, ApiError> {
        match self {
            RefreshOutcome::Refreshed(token) => Ok(token),
            RefreshOutcome::Failed(reason) => Err(ApiError::SessionExpired(reason)),
        }
    }
}

pub type Slot = watch::Receiver<Option<RefreshOutcome>>;

enum GateState {
    Idle,
    Refreshing { generation: u64, slot: Slot },
}

struct Inner {
    state: GateState,
    generation: u64,
}

pub struct RefreshGate {
    inner: Mutex<Inner>,
}

pub enum Entry<'a> {
    /// This caller must run the refresh and publish through the lease.
    Leader(RefreshLease<'a>),
    /// A refresh is already in flight; wait on this slot.
    Waiter(Slot),
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: GateState::Idle,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.lock().state, GateState::Refreshing { .. })
    }

    pub fn enter(&self) -> Entry<'_> {
        let mut inner = self.lock();
        if let GateState::Refreshing { slot, generation } = &inner.state {
            debug!(generation, "token refresh in flight; waiting for it");
            return Entry::Waiter(slot.clone());
        }

        inner.generation += 1;
        let generation = inner.generation;
        let (tx, rx) = watch::channel(None);
        inner.state = GateState::Refreshing {
            generation,
            slot: rx,
        };
        debug!(generation, "starting token refresh");

        Entry::Leader(RefreshLease {
            gate: self,
            generation,
            tx: Some(tx),
        })
    }

    pub async fn wait(mut slot: Slot) -> Result<String, ApiError> {
        let outcome = slot
            .wait_for(Option::is_some)
            .await
            .map(|published| published.clone());
        match outcome {
            Ok(Some(outcome)) => outcome.into_result(),
            _ => Err(ApiError::SessionExpired(
                "token refresh was abandoned".to_string(),
            )),
        }
    }
}

/// Held by the leader while its refresh runs. Dropping it without publishing
/// returns the gate to idle and wakes waiters with a closed channel.
pub struct RefreshLease<'a> {
    gate: &'a RefreshGate,
    generation: u64,
    tx: Option<watch::Sender<Option<RefreshOutcome>>>,
}

impl RefreshLease<'_> {
    pub fn publish(mut self, outcome: RefreshOutcome) {
        self.finish(Some(outcome));
    }

    fn finish(&mut self, outcome: Option<RefreshOutcome>) {
        let Some(tx) = self.tx.take() else { return };

        let mut inner = self.gate.lock();
        if matches!(inner.state, GateState::Refreshing { generation, .. } if generation == self.generation)
        {
            inner.state = GateState::Idle;
        }
        if let Some(outcome) = outcome {
            tx.send_replace(Some(outcome));
        }
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        self.finish(None);
    }
}
