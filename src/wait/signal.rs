//! Per-request wake signal shared between a waiter and the topics it watches.

use crate::types::{WaitMode, WaitState};
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Identifies one registration across all topic waiter lists.
pub(crate) type WaitId = u64;

struct SignalInner {
    /// One flag per watched topic, in request order.
    fired: Vec<bool>,
    state: WaitState,
}

/// Wake signal for a single wait request.
///
/// Topic writes call [`WaitSignal::fire`] while holding the topic lock. The
/// owning waiter blocks in [`WaitSignal::resolve`]. Fires are accumulated until
/// the waiter observes them, so topics notified in the same step are reported
/// together.
pub(crate) struct WaitSignal {
    id: WaitId,
    mode: WaitMode,
    topics: Vec<String>,
    inner: Mutex<SignalInner>,
    cond: Condvar,
}

impl WaitSignal {
    pub(crate) fn new(id: WaitId, mode: WaitMode, topics: Vec<String>) -> Self {
        let fired = vec![false; topics.len()];
        Self {
            id,
            mode,
            topics,
            inner: Mutex::new(SignalInner {
                fired,
                state: WaitState::Pending,
            }),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn id(&self) -> WaitId {
        self.id
    }

    pub(crate) fn topics(&self) -> &[String] {
        &self.topics
    }

    pub(crate) fn state(&self) -> WaitState {
        self.inner.lock().state
    }

    /// Record a notification from `topic`. Ignored once the request is terminal.
    pub(crate) fn fire(&self, topic: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.state != WaitState::Pending {
            return false;
        }

        let Some(index) = self.topics.iter().position(|t| t == topic) else {
            return false;
        };
        inner.fired[index] = true;

        if self.is_satisfied(&inner) {
            self.cond.notify_all();
        }
        true
    }

    /// Block until satisfied or until `deadline` passes.
    ///
    /// Returns the topics that fired (request order) when satisfied, `None`
    /// on timeout. A request that is already satisfied when the deadline is
    /// reached resolves as satisfied.
    pub(crate) fn resolve(&self, deadline: Option<Instant>) -> Option<Vec<String>> {
        let mut inner = self.inner.lock();
        loop {
            if self.is_satisfied(&inner) {
                inner.state = WaitState::Satisfied;
                return Some(self.fired_topics(&inner));
            }

            match deadline {
                None => self.cond.wait(&mut inner),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        inner.state = WaitState::TimedOut;
                        return None;
                    }
                    self.cond.wait_until(&mut inner, deadline);
                }
            }
        }
    }

    /// Move a pending request to `Cancelled`. Returns false if already terminal.
    pub(crate) fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return false;
        }
        inner.state = WaitState::Cancelled;
        true
    }

    fn is_satisfied(&self, inner: &SignalInner) -> bool {
        match self.mode {
            WaitMode::All => inner.fired.iter().all(|f| *f),
            WaitMode::Any => inner.fired.iter().any(|f| *f),
        }
    }

    fn fired_topics(&self, inner: &SignalInner) -> Vec<String> {
        self.topics
            .iter()
            .zip(&inner.fired)
            .filter(|(_, fired)| **fired)
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}
