//! Deadline-bounded monitor loops built on the wait primitives.

use crate::error::Result;
use crate::topics::TopicStore;
use crate::types::WaitMode;
use crate::wait::{Deadline, WaitRequest};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How a monitor finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorOutcome {
    ConditionMet,
    DeadlineExceeded,
}

/// Summary of a finished monitor run.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorReport {
    pub outcome: MonitorOutcome,
    /// Number of wakeups observed.
    pub wakeups: usize,
    /// Topics reported by the last wakeup.
    pub last_arrived: Vec<String>,
    pub elapsed: Duration,
}

impl MonitorReport {
    pub fn is_met(&self) -> bool {
        self.outcome == MonitorOutcome::ConditionMet
    }
}

/// Waits on a topic set and evaluates a predicate after every wakeup, until
/// the predicate holds or the deadline passes.
#[derive(Clone, Debug)]
pub struct Monitor<'a> {
    store: &'a TopicStore,
    request: WaitRequest,
    budget: Duration,
}

impl<'a> Monitor<'a> {
    pub fn new(store: &'a TopicStore, request: WaitRequest, budget: Duration) -> Self {
        Self {
            store,
            request,
            budget,
        }
    }

    pub fn any<I, S>(store: &'a TopicStore, topics: I, budget: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(store, WaitRequest::any(topics)?, budget))
    }

    pub fn all<I, S>(store: &'a TopicStore, topics: I, budget: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(store, WaitRequest::all(topics)?, budget))
    }

    pub fn mode(&self) -> WaitMode {
        self.request.mode()
    }

    /// Run the loop. The predicate sees the store and the topics that woke
    /// this iteration.
    ///
    /// The next wait is registered before the predicate runs, so writes that
    /// land during evaluation still wake the following iteration. Unknown
    /// topics fail immediately rather than timing out.
    pub fn run<F>(&self, mut predicate: F) -> Result<MonitorReport>
    where
        F: FnMut(&TopicStore, &[String]) -> Result<bool>,
    {
        let deadline = Deadline::after(self.budget);
        let mut wakeups = 0;
        let mut last_arrived = Vec::new();
        let mut pending = self.store.register(self.request.clone())?;

        loop {
            match pending.wait_deadline(&deadline) {
                Ok(arrived) => {
                    wakeups += 1;
                    let next = self.store.register(self.request.clone())?;
                    tracing::info!(arrived = %arrived.join(", "), "topics arrived");

                    if predicate(self.store, &arrived)? {
                        tracing::info!(wakeups, "monitor condition met");
                        return Ok(MonitorReport {
                            outcome: MonitorOutcome::ConditionMet,
                            wakeups,
                            last_arrived: arrived,
                            elapsed: deadline.elapsed(),
                        });
                    }

                    last_arrived = arrived;
                    pending = next;
                }
                Err(e) if e.is_timeout() => {
                    tracing::warn!(wakeups, budget = ?self.budget, "monitor deadline exceeded");
                    return Ok(MonitorReport {
                        outcome: MonitorOutcome::DeadlineExceeded,
                        wakeups,
                        last_arrived,
                        elapsed: self.budget,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Logs every arrival on a topic set until stopped.
#[derive(Clone, Debug)]
pub struct ArrivalNotifier<'a> {
    store: &'a TopicStore,
    request: WaitRequest,
    poll_interval: Duration,
}

impl<'a> ArrivalNotifier<'a> {
    pub fn new<I, S>(store: &'a TopicStore, topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            store,
            request: WaitRequest::any(topics)?,
            poll_interval: Duration::from_millis(100),
        })
    }

    /// Watch every registered topic.
    pub fn all_topics(store: &'a TopicStore) -> Result<Self> {
        Self::new(store, store.topic_names().iter().cloned())
    }

    /// How often the stop flag is checked while nothing arrives.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until `stop` is set. Returns arrivals seen per topic.
    ///
    /// The counts are a lower bound. After a wakeup or a poll timeout the next
    /// wait is registered only once the previous one has resolved, and a
    /// write landing in that gap is not counted.
    pub fn run(&self, stop: &AtomicBool) -> Result<BTreeMap<String, u64>> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut pending = self.store.register(self.request.clone())?;

        while !stop.load(Ordering::Acquire) {
            match pending.wait_timeout(self.poll_interval) {
                Ok(arrived) => {
                    pending = self.store.register(self.request.clone())?;
                    tracing::info!(arrived = %arrived.join(", "), "message arrived");
                    for topic in arrived {
                        *counts.entry(topic).or_default() += 1;
                    }
                }
                Err(e) if e.is_timeout() => {
                    pending = self.store.register(self.request.clone())?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::dispatch::Dispatcher;
    use crate::error::NotifyError;
    use crate::types::{Message, Payload};
    use std::thread;

    fn wait_for_waiters(store: &TopicStore, topic: &str, count: usize) {
        let deadline = Deadline::after(Duration::from_secs(5));
        while store.waiter_count(topic).unwrap() < count {
            assert!(!deadline.is_expired(), "waiter never registered on {topic}");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_monitor_meets_condition() {
        let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();

        thread::scope(|s| {
            let handle = s.spawn(|| {
                Monitor::any(&store, ["a", "b"], Duration::from_secs(5))
                    .unwrap()
                    .run(|store, _| Ok(store.value("a", "1")? == Some(3.0)))
                    .unwrap()
            });

            for v in [1.0, 2.0, 3.0] {
                wait_for_waiters(&store, "a", 1);
                dispatcher
                    .dispatch_message(Message::new("a", Payload::new().with("1", v)))
                    .unwrap();
            }

            let report = handle.join().unwrap();
            assert!(report.is_met());
            assert!(report.wakeups >= 1);
            assert_eq!(report.last_arrived, vec!["a"]);
        });
    }

    #[test]
    fn test_monitor_times_out() {
        let (store, _dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
        let report = Monitor::any(&store, ["c"], Duration::from_millis(30))
            .unwrap()
            .run(|_, _| Ok(true))
            .unwrap();

        assert_eq!(report.outcome, MonitorOutcome::DeadlineExceeded);
        assert_eq!(report.wakeups, 0);
        assert_eq!(store.waiter_count("c").unwrap(), 0);
    }

    #[test]
    fn test_monitor_unknown_topic_fails_fast() {
        let (store, _dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
        let result = Monitor::any(&store, ["x"], Duration::from_secs(60))
            .unwrap()
            .run(|_, _| Ok(true));
        assert!(matches!(result, Err(NotifyError::UnknownTopic(t)) if t == "x"));
    }

    #[test]
    fn test_arrival_notifier_counts() {
        let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
        let stop = AtomicBool::new(false);

        thread::scope(|s| {
            let handle = s.spawn(|| {
                ArrivalNotifier::all_topics(&store)
                    .unwrap()
                    .with_poll_interval(Duration::from_millis(500))
                    .run(&stop)
                    .unwrap()
            });

            wait_for_waiters(&store, "b", 1);
            dispatcher
                .dispatch_message(Message::new("b", Payload::new().with("3", 1.0)))
                .unwrap();
            wait_for_waiters(&store, "b", 1);
            stop.store(true, Ordering::Release);

            let counts = handle.join().unwrap();
            assert_eq!(counts.get("b"), Some(&1));
            assert_eq!(counts.get("a"), None);
        });
    }
}
