//! Startup-time configuration: topic registrations and message routes.

use crate::dispatch::WireFormat;
use crate::error::{NotifyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// A topic to register at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicSpec {
    /// Unique topic name.
    pub name: String,

    /// Expected payload sub-keys. The initial payload holds each at zero.
    #[serde(default)]
    pub keys: Vec<String>,
}

impl TopicSpec {
    pub fn new<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

/// Store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Topics, fixed for the life of the store.
    pub topics: Vec<TopicSpec>,

    /// Message type to topic name. Empty means every topic is reached by a
    /// message type of the same name.
    pub routes: BTreeMap<String, String>,

    /// Encoding of inbound raw messages.
    pub wire_format: WireFormat,

    /// Reject payloads carrying sub-keys not listed for their topic.
    pub strict_payload_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            routes: BTreeMap::new(),
            wire_format: WireFormat::Json,
            strict_payload_keys: false,
        }
    }
}

impl StoreConfig {
    pub fn new(topics: Vec<TopicSpec>) -> Self {
        Self {
            topics,
            ..Default::default()
        }
    }

    /// Three topics `a`, `b` and `c` with two sub-keys each.
    pub fn demo() -> Self {
        Self::new(vec![
            TopicSpec::new("a", ["1", "2"]),
            TopicSpec::new("b", ["3", "4"]),
            TopicSpec::new("c", ["5", "6"]),
        ])
    }

    pub fn with_route(mut self, message_type: impl Into<String>, topic: impl Into<String>) -> Self {
        self.routes.insert(message_type.into(), topic.into());
        self
    }

    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    pub fn with_strict_payload_keys(mut self, strict: bool) -> Self {
        self.strict_payload_keys = strict;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: StoreConfig =
            serde_json::from_str(json).map_err(|e| NotifyError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check topic names are unique and every route targets a registered topic.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for topic in &self.topics {
            if topic.name.is_empty() {
                return Err(NotifyError::InvalidConfig("empty topic name".into()));
            }
            if !seen.insert(topic.name.as_str()) {
                return Err(NotifyError::TopicExists(topic.name.clone()));
            }
        }

        for (message_type, topic) in &self.routes {
            if !seen.contains(topic.as_str()) {
                return Err(NotifyError::InvalidConfig(format!(
                    "route {message_type:?} targets unregistered topic {topic:?}"
                )));
            }
        }

        Ok(())
    }

    /// The effective message type to topic table.
    pub fn effective_routes(&self) -> BTreeMap<String, String> {
        if self.routes.is_empty() {
            self.topics
                .iter()
                .map(|t| (t.name.clone(), t.name.clone()))
                .collect()
        } else {
            self.routes.clone()
        }
    }
}
