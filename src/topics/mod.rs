//! Topic storage.
//!
//! Each topic holds its most recent payload, a generation counter and the
//! list of waiters registered on it. Writes replace the payload and wake the
//! whole list in one locked step.

mod store;

pub use store::{SetOutcome, TopicStore};
