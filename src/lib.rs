//! # Topic Watch
//!
//! An in-process publish/notify store: named topics hold their most recent
//! payload, and waiters block until topics they care about are written.
//!
//! ## Core Concepts
//!
//! - **Topics**: fixed at startup; each holds the latest payload and a
//!   generation counter
//! - **Dispatcher**: the only writer; decodes raw messages, routes them by
//!   declared type and wakes every waiter on the topic
//! - **Waits**: `all` / `any` over a topic set, optionally bounded by a
//!   deadline, with timeouts reported distinctly from success
//! - **Monitors**: loops that wait, inspect current values and decide
//!
//! ## Example
//!
//! ```ignore
//! use topicwatch::{Dispatcher, StoreConfig};
//! use std::time::Duration;
//!
//! let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo())?;
//!
//! // Register first, then the write is guaranteed to be observed.
//! let pending = store.wait_all(["a", "b"])?;
//! dispatcher.dispatch(br#"{"type":"a","payload":{"1":1}}"#)?;
//! dispatcher.dispatch(br#"{"type":"b","payload":{"3":1}}"#)?;
//!
//! let arrived = pending.wait_timeout(Duration::from_secs(2))?;
//! assert_eq!(store.value("a", "1")?, Some(1.0));
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod monitor;
pub mod topics;
pub mod transport;
pub mod types;
pub mod wait;

// Re-exports
pub use config::{StoreConfig, TopicSpec};
pub use dispatch::{DispatchReceipt, DispatchStats, Dispatcher, HandlerTable, WireFormat};
pub use error::{NotifyError, Result};
pub use monitor::{
    wait_values, wait_values_at_once, ArrivalNotifier, Comparison, Condition, Monitor,
    MonitorOutcome, MonitorReport,
};
pub use topics::{SetOutcome, TopicStore};
pub use transport::{
    channel, ChannelSink, ChannelSource, DecoderWorker, Generator, GeneratorHandle,
    GeneratorStream, MessageSink, MessageSource, PumpStats, UdpSink, UdpSource,
};
pub use types::*;
pub use wait::{with_timeout, Deadline, PendingWait, WaitRequest};
