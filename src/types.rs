//! Core types for the topic store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Latest value of a topic: sub-key to numeric value.
///
/// The store routes payloads by topic and never interprets their contents.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, f64>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload with every key set to zero.
    pub fn zeroed<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Payload(keys.into_iter().map(|k| (k.into(), 0.0)).collect())
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut f64)> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Payload {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Payload(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// An inbound message: declared type plus the new payload for its topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: Payload,
}

impl Message {
    pub fn new(message_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
        }
    }
}

/// Per-topic write counter. Zero means the topic still holds its initial payload.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen({})", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Consistent read of a single topic.
#[derive(Clone, Debug, PartialEq)]
pub struct TopicSnapshot {
    pub name: String,
    pub payload: Payload,
    pub generation: Generation,
}

/// How a wait over several topics resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
    /// Every named topic must notify at least once.
    All,
    /// At least one named topic must notify.
    Any,
}

/// Lifecycle of a single wait request. Terminal states never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitState {
    Pending,
    Satisfied,
    TimedOut,
    Cancelled,
}

impl WaitState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, WaitState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_json_shape() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"a","payload":{"1":1,"2":2.5}}"#).unwrap();
        assert_eq!(msg.message_type, "a");
        assert_eq!(msg.payload.get("1"), Some(1.0));
        assert_eq!(msg.payload.get("2"), Some(2.5));
    }

    #[test]
    fn test_message_rejects_extra_fields() {
        let result: std::result::Result<Message, _> =
            serde_json::from_str(r#"{"type":"a","payload":{},"extra":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_zeroed_payload() {
        let payload = Payload::zeroed(["1", "2"]);
        assert_eq!(payload.len(), 2);
        assert!(payload.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_wait_state_terminal() {
        assert!(!WaitState::Pending.is_terminal());
        assert!(WaitState::Satisfied.is_terminal());
        assert!(WaitState::TimedOut.is_terminal());
        assert!(WaitState::Cancelled.is_terminal());
    }
}
