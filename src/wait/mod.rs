//! Wait primitives over the topic store.
//!
//! A wait registers interest in one or more topics and blocks until they
//! notify:
//! - `All`: every named topic has notified since registration
//! - `Any`: at least one has; every topic that notified before the waiter
//!   woke is reported
//!
//! Notifications are not queued. A waiter only observes writes that start
//! after it registered, and repeated writes to one topic while a waiter is
//! blocked on a slower topic are not individually visible. Read the store
//! after waking to see current values.
//!
//! # Example
//!
//! ```ignore
//! let pending = store.wait_any(["a", "b"])?;
//! // ... writes happen elsewhere ...
//! match with_timeout(Duration::from_secs(2), pending) {
//!     Ok(arrived) => println!("{arrived:?} arrived"),
//!     Err(e) if e.is_timeout() => println!("nothing arrived"),
//!     Err(e) => return Err(e),
//! }
//! ```

mod request;
mod signal;

pub use request::{with_timeout, Deadline, PendingWait, WaitRequest};
pub(crate) use signal::{WaitId, WaitSignal};
