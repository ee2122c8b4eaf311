//! Per-operation request state: loading flag plus the settled result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a panel shows once a request has settled.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Outcome {
    /// Input was missing; nothing was sent.
    Prompt(String),
    /// The backend answered successfully.
    Success(String),
    /// The backend refused, or could not be reached.
    Failure(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Prompt(m) | Outcome::Success(m) | Outcome::Failure(m) => m,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: usize,
    generation: u64,
    outcome: Option<Outcome>,
}

/// Loading flag and result slot for one kind of request.
///
/// Every interaction bumps a generation counter. A request only writes its
/// result if no newer interaction started meanwhile, so the most recently
/// issued request wins regardless of completion order.
#[derive(Debug, Clone, Default)]
pub struct RequestSlot {
    inner: Arc<Mutex<Slot>>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// True while at least one request is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.lock().outcome.clone()
    }

    /// Start a request: clears the shown result and raises the loading flag
    /// until the returned guard is dropped.
    pub fn begin(&self) -> InFlight {
        let mut slot = self.lock();
        slot.in_flight += 1;
        slot.generation += 1;
        slot.outcome = None;
        InFlight {
            slot: self.clone(),
            generation: slot.generation,
        }
    }

    /// Settle without a request (validation prompt). Supersedes anything in flight.
    pub fn settle_local(&self, outcome: Outcome) -> Outcome {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.outcome = Some(outcome.clone());
        outcome
    }

    /// Drop the shown result and supersede anything in flight.
    pub fn reset(&self) {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.outcome = None;
    }
}

/// A request in progress. Dropping it lowers the loading flag, on every
/// exit path including early returns and cancellation.
#[derive(Debug)]
pub struct InFlight {
    slot: RequestSlot,
    generation: u64,
}

impl InFlight {
    /// Whether this request is still the newest one.
    pub fn is_current(&self) -> bool {
        self.slot.lock().generation == self.generation
    }

    /// Publish `outcome` if this request is still current. Returns whether it
    /// was published; `outcome` is handed back either way.
    pub fn settle(self, outcome: Outcome) -> (bool, Outcome) {
        let mut slot = self.slot.lock();
        let current = slot.generation == self.generation;
        if current {
            slot.outcome = Some(outcome.clone());
        } else {
            tracing::debug!(
                generation = self.generation,
                newest = slot.generation,
                "discarding stale result"
            );
        }
        (current, outcome)
    }

    /// Finish with nothing to show.
    pub fn clear(self) -> bool {
        let mut slot = self.slot.lock();
        let current = slot.generation == self.generation;
        if current {
            slot.outcome = None;
        }
        current
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        slot.in_flight = slot.in_flight.saturating_sub(1);
    }
}
