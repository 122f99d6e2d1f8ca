//! Wait requests and their pending handles.

use crate::error::{NotifyError, Result};
use crate::topics::TopicStore;
use crate::types::{WaitMode, WaitState};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::signal::WaitSignal;

/// A set of topics to wait on, a mode and an optional deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitRequest {
    topics: Vec<String>,
    mode: WaitMode,
    deadline: Option<Instant>,
}

impl WaitRequest {
    /// Build a request. Duplicate names collapse to their first occurrence.
    pub fn new<I, S>(mode: WaitMode, topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for topic in topics {
            let topic = topic.into();
            if !names.contains(&topic) {
                names.push(topic);
            }
        }

        if names.is_empty() {
            return Err(NotifyError::EmptyWaitSet);
        }

        Ok(Self {
            topics: names,
            mode,
            deadline: None,
        })
    }

    pub fn all<I, S>(topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(WaitMode::All, topics)
    }

    pub fn any<I, S>(topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(WaitMode::Any, topics)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now. A timeout too large to represent leaves
    /// the request unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn mode(&self) -> WaitMode {
        self.mode
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// A registered wait that has not been resolved yet.
///
/// Registration happens when the handle is created, so any topic write that
/// starts after that point is observed. Dropping an unresolved handle cancels
/// it and removes its registration from every topic.
#[must_use = "a pending wait does nothing unless waited on"]
pub struct PendingWait<'a> {
    store: &'a TopicStore,
    request: WaitRequest,
    signal: Arc<WaitSignal>,
    registered_at: Instant,
    detached: bool,
}

impl<'a> PendingWait<'a> {
    pub(crate) fn new(store: &'a TopicStore, request: WaitRequest, signal: Arc<WaitSignal>) -> Self {
        Self {
            store,
            request,
            signal,
            registered_at: Instant::now(),
            detached: false,
        }
    }

    pub fn request(&self) -> &WaitRequest {
        &self.request
    }

    pub fn state(&self) -> WaitState {
        self.signal.state()
    }

    /// Block until the request is satisfied or its own deadline passes.
    ///
    /// `All` returns every requested topic. `Any` returns each topic that
    /// notified before the waiter woke, in request order.
    pub fn wait(mut self) -> Result<Vec<String>> {
        let deadline = self.request.deadline;
        self.resolve(deadline)
    }

    /// Like [`PendingWait::wait`], bounded by `timeout` from now (or the
    /// request deadline if that is earlier).
    pub fn wait_timeout(self, timeout: Duration) -> Result<Vec<String>> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(deadline),
            None => self.wait(),
        }
    }

    /// Like [`PendingWait::wait_until`], bounded by a [`Deadline`].
    pub fn wait_deadline(self, deadline: &Deadline) -> Result<Vec<String>> {
        match deadline.instant() {
            Some(at) => self.wait_until(at),
            None => self.wait(),
        }
    }

    pub fn wait_until(mut self, deadline: Instant) -> Result<Vec<String>> {
        let deadline = match self.request.deadline {
            Some(own) => own.min(deadline),
            None => deadline,
        };
        self.resolve(Some(deadline))
    }

    /// Abandon the wait. Equivalent to dropping the handle.
    pub fn cancel(self) {}

    fn resolve(&mut self, deadline: Option<Instant>) -> Result<Vec<String>> {
        let outcome = self.signal.resolve(deadline);
        self.detach();

        match outcome {
            Some(topics) => Ok(topics),
            None => Err(NotifyError::DeadlineExceeded(self.registered_at.elapsed())),
        }
    }

    fn detach(&mut self) {
        if !self.detached {
            self.store.detach(&self.signal);
            self.detached = true;
        }
    }
}

impl Drop for PendingWait<'_> {
    fn drop(&mut self) {
        if !self.detached {
            self.signal.cancel();
            self.detach();
        }
    }
}

impl fmt::Debug for PendingWait<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWait")
            .field("id", &self.signal.id())
            .field("request", &self.request)
            .field("state", &self.state())
            .finish()
    }
}

/// Bound a registered wait by `timeout`.
///
/// Resolves with exactly one of the wait's result or
/// [`NotifyError::DeadlineExceeded`]. On expiry the wait is detached from all
/// of its topics.
pub fn with_timeout(timeout: Duration, wait: PendingWait<'_>) -> Result<Vec<String>> {
    wait.wait_timeout(timeout)
}

/// An absolute point in time bounding a sequence of waits.
///
/// A budget too large to add to the current instant never expires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline {
    started: Instant,
    at: Option<Instant>,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: started.checked_add(budget),
            budget,
        }
    }

    /// `None` when unbounded.
    pub fn instant(&self) -> Option<Instant> {
        self.at
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time since the deadline was set.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        match self.at {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}
