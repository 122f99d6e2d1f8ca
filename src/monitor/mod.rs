//! Monitors: application-level loops composed from the wait primitives.
//!
//! - [`Monitor`] waits on a topic set and checks a predicate after each wakeup
//! - [`ArrivalNotifier`] logs arrivals until told to stop
//! - [`wait_values`] / [`wait_values_at_once`] watch for value conditions
//!
//! Every monitor is bounded by a deadline and reports expiry as
//! [`MonitorOutcome::DeadlineExceeded`], distinct from success. Referencing a
//! topic that was never registered is an error, not a timeout.

mod condition;
mod watch;

pub use condition::{wait_values, wait_values_at_once, Comparison, Condition};
pub use watch::{ArrivalNotifier, Monitor, MonitorOutcome, MonitorReport};
