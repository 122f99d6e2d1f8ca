//! Routes decoded messages to their topics.

use crate::config::StoreConfig;
use crate::error::{NotifyError, Result};
use crate::topics::TopicStore;
use crate::types::{Generation, Message};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::codec::WireFormat;

/// Static message type to topic table, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct HandlerTable {
    routes: HashMap<String, String>,
}

impl HandlerTable {
    /// Build the table for a store. Every route must target a registered topic.
    pub fn from_config(config: &StoreConfig, store: &TopicStore) -> Result<Self> {
        let mut routes = HashMap::new();
        for (message_type, topic) in config.effective_routes() {
            if !store.contains(&topic) {
                return Err(NotifyError::InvalidConfig(format!(
                    "route {message_type:?} targets unregistered topic {topic:?}"
                )));
            }
            routes.insert(message_type, topic);
        }
        Ok(Self { routes })
    }

    pub fn resolve(&self, message_type: &str) -> Option<&str> {
        self.routes.get(message_type).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// What a successful dispatch did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub message_type: String,
    pub topic: String,
    pub generation: Generation,
    /// Waiters signalled by the write.
    pub woken: usize,
}

/// Point-in-time dispatch counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub malformed: u64,
    pub unknown_type: u64,
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicU64,
    malformed: AtomicU64,
    unknown_type: AtomicU64,
}

/// The sole writer of the topic store.
///
/// Each call handles one message: decode, route, write, wake. Failures are
/// local to that message and returned to the caller; nothing is retried.
pub struct Dispatcher {
    store: Arc<TopicStore>,
    handlers: HandlerTable,
    format: WireFormat,
    strict_payload_keys: bool,
    counters: Counters,
}

impl Dispatcher {
    pub fn new(store: Arc<TopicStore>, config: &StoreConfig) -> Result<Self> {
        let handlers = HandlerTable::from_config(config, &store)?;
        Ok(Self {
            store,
            handlers,
            format: config.wire_format,
            strict_payload_keys: config.strict_payload_keys,
            counters: Counters::default(),
        })
    }

    /// Build a store and its dispatcher from one configuration.
    pub fn with_store(config: &StoreConfig) -> Result<(Arc<TopicStore>, Self)> {
        let store = Arc::new(TopicStore::new(config)?);
        let dispatcher = Self::new(Arc::clone(&store), config)?;
        Ok((store, dispatcher))
    }

    pub fn store(&self) -> &Arc<TopicStore> {
        &self.store
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn wire_format(&self) -> WireFormat {
        self.format
    }

    /// Decode a raw message and dispatch it.
    pub fn dispatch(&self, raw: &[u8]) -> Result<DispatchReceipt> {
        let message = match self.format.decode(raw) {
            Ok(message) => message,
            Err(e) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        self.dispatch_message(message)
    }

    /// Dispatch an already decoded message.
    pub fn dispatch_message(&self, message: Message) -> Result<DispatchReceipt> {
        let Some(topic) = self.handlers.resolve(&message.message_type) else {
            self.counters.unknown_type.fetch_add(1, Ordering::Relaxed);
            return Err(NotifyError::UnknownMessageType(message.message_type));
        };

        if self.strict_payload_keys {
            let expected = self.store.expected_keys(topic)?;
            if let Some(key) = message
                .payload
                .keys()
                .find(|k| !expected.iter().any(|e| e.as_str() == *k))
            {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                return Err(NotifyError::MalformedMessage(format!(
                    "unexpected key {key:?} for topic {topic:?}"
                )));
            }
        }

        let outcome = self.store.set(topic, message.payload)?;
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            message_type = %message.message_type,
            topic,
            generation = %outcome.generation,
            woken = outcome.woken,
            "dispatched"
        );

        Ok(DispatchReceipt {
            topic: topic.to_string(),
            message_type: message.message_type,
            generation: outcome.generation,
            woken: outcome.woken,
        })
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            malformed: self.counters.malformed.load(Ordering::Relaxed),
            unknown_type: self.counters.unknown_type.load(Ordering::Relaxed),
        }
    }
}
