//! Process-wide topic store with per-topic waiter lists.

use crate::config::StoreConfig;
use crate::error::{NotifyError, Result};
use crate::types::{Generation, Payload, TopicSnapshot, WaitMode};
use crate::wait::{PendingWait, WaitId, WaitRequest, WaitSignal};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Mutable part of a topic, guarded as one unit so readers never see a
/// payload without its generation and writes notify under the same lock.
struct TopicSlot {
    payload: Payload,
    generation: Generation,
    waiters: Vec<Arc<WaitSignal>>,
}

struct Topic {
    keys: Vec<String>,
    slot: Mutex<TopicSlot>,
}

/// Result of a topic write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetOutcome {
    /// Generation of the topic after the write.
    pub generation: Generation,
    /// Number of registered waiters that were signalled.
    pub woken: usize,
}

/// Latest payload per topic plus wakeups for waiters.
///
/// The set of topics is fixed when the store is built. Only the dispatcher
/// writes payloads; any number of threads may read and wait.
pub struct TopicStore {
    topics: HashMap<String, Topic>,
    /// Registration order, for listing.
    names: Vec<String>,
    next_wait_id: AtomicU64,
}

impl TopicStore {
    /// Build a store from a validated configuration. Every topic starts with
    /// its keys at zero.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let mut topics = HashMap::with_capacity(config.topics.len());
        let mut names = Vec::with_capacity(config.topics.len());
        for spec in &config.topics {
            let topic = Topic {
                keys: spec.keys.clone(),
                slot: Mutex::new(TopicSlot {
                    payload: Payload::zeroed(spec.keys.iter().cloned()),
                    generation: Generation::default(),
                    waiters: Vec::new(),
                }),
            };
            if topics.insert(spec.name.clone(), topic).is_some() {
                return Err(NotifyError::TopicExists(spec.name.clone()));
            }
            names.push(spec.name.clone());
        }

        Ok(Self {
            topics,
            names,
            next_wait_id: AtomicU64::new(1),
        })
    }

    fn topic(&self, name: &str) -> Result<&Topic> {
        self.topics
            .get(name)
            .ok_or_else(|| NotifyError::UnknownTopic(name.to_string()))
    }

    // --- Reads ---

    pub fn contains(&self, name: &str) -> bool {
        self.topics.contains_key(name)
    }

    /// Topic names in registration order.
    pub fn topic_names(&self) -> &[String] {
        &self.names
    }

    /// Sub-keys registered for a topic.
    pub fn expected_keys(&self, name: &str) -> Result<&[String]> {
        Ok(&self.topic(name)?.keys)
    }

    /// Current payload of a topic.
    pub fn get(&self, name: &str) -> Result<Payload> {
        Ok(self.topic(name)?.slot.lock().payload.clone())
    }

    /// Current value of one sub-key, `None` if the payload lacks it.
    pub fn value(&self, name: &str, key: &str) -> Result<Option<f64>> {
        Ok(self.topic(name)?.slot.lock().payload.get(key))
    }

    pub fn generation(&self, name: &str) -> Result<Generation> {
        Ok(self.topic(name)?.slot.lock().generation)
    }

    /// Payload and generation read under one lock.
    pub fn snapshot(&self, name: &str) -> Result<TopicSnapshot> {
        let slot = self.topic(name)?.slot.lock();
        Ok(TopicSnapshot {
            name: name.to_string(),
            payload: slot.payload.clone(),
            generation: slot.generation,
        })
    }

    /// Number of live wait registrations on a topic.
    pub fn waiter_count(&self, name: &str) -> Result<usize> {
        Ok(self.topic(name)?.slot.lock().waiters.len())
    }

    // --- Writes ---

    /// Overwrite a topic's payload and wake everything waiting on it.
    ///
    /// The write and the wakeups happen under the topic lock, so a waiter
    /// registered before this call starts always observes it. Never blocks on
    /// waiters; they are only signalled.
    pub(crate) fn set(&self, name: &str, payload: Payload) -> Result<SetOutcome> {
        let topic = self.topic(name)?;
        let mut slot = topic.slot.lock();

        slot.payload = payload;
        slot.generation = slot.generation.next();

        let waiters = std::mem::take(&mut slot.waiters);
        for waiter in &waiters {
            waiter.fire(name);
        }

        tracing::trace!(topic = name, generation = %slot.generation, woken = waiters.len(), "topic updated");

        Ok(SetOutcome {
            generation: slot.generation,
            woken: waiters.len(),
        })
    }

    // --- Waits ---

    /// Register a wait. Unknown topics fail before anything is registered.
    pub fn register(&self, request: WaitRequest) -> Result<PendingWait<'_>> {
        for name in request.topics() {
            self.topic(name)?;
        }

        let id: WaitId = self.next_wait_id.fetch_add(1, Ordering::Relaxed);
        let signal = Arc::new(WaitSignal::new(id, request.mode(), request.topics().to_vec()));

        for name in request.topics() {
            self.topic(name)?.slot.lock().waiters.push(Arc::clone(&signal));
        }

        Ok(PendingWait::new(self, request, signal))
    }

    /// Register a wait for the next write to one topic.
    pub fn wait_topic(&self, name: &str) -> Result<PendingWait<'_>> {
        self.register(WaitRequest::new(WaitMode::All, [name])?)
    }

    /// Register a wait for every named topic to be written at least once.
    pub fn wait_all<I, S>(&self, names: I) -> Result<PendingWait<'_>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(WaitRequest::all(names)?)
    }

    /// Register a wait for any named topic to be written.
    pub fn wait_any<I, S>(&self, names: I) -> Result<PendingWait<'_>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(WaitRequest::any(names)?)
    }

    /// Block until the topic is next written; returns its name.
    pub fn await_topic(&self, name: &str) -> Result<String> {
        let mut arrived = self.wait_topic(name)?.wait()?;
        Ok(arrived.remove(0))
    }

    /// Block until every named topic has been written since the call.
    pub fn await_all<I, S>(&self, names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wait_all(names)?.wait()
    }

    /// Block until any named topic is written; returns all that were.
    pub fn await_any<I, S>(&self, names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wait_any(names)?.wait()
    }

    /// Remove a signal from every topic it was registered on.
    pub(crate) fn detach(&self, signal: &WaitSignal) {
        for name in signal.topics() {
            if let Some(topic) = self.topics.get(name) {
                topic
                    .slot
                    .lock()
                    .waiters
                    .retain(|waiter| waiter.id() != signal.id());
            }
        }
    }
}

impl std::fmt::Debug for TopicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicStore")
            .field("topics", &self.names)
            .finish()
    }
}
