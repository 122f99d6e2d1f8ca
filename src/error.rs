//! Error types for the topic store, dispatcher and wait primitives.

use std::time::Duration;
use thiserror::Error;

/// Main error type for topic store operations.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Raw input could not be decoded into a type + payload pair.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The declared message type has no registered handler.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// A read or wait referenced a topic that was never registered.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// A bounded wait did not resolve in time.
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Wait request names no topics")]
    EmptyWaitSet,

    #[error("Topic already registered: {0}")]
    TopicExists(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl NotifyError {
    /// True for the timeout outcome of a bounded wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NotifyError::DeadlineExceeded(_))
    }

    /// Errors local to a single message or wait that callers are expected to
    /// handle and move past. Configuration and unknown-topic errors are bugs.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            NotifyError::MalformedMessage(_)
                | NotifyError::UnknownMessageType(_)
                | NotifyError::DeadlineExceeded(_)
        )
    }
}

impl From<rmp_serde::encode::Error> for NotifyError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        NotifyError::Serialization(e.to_string())
    }
}

/// Result type for topic store operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
