//! Inbound message decoding and dispatch.
//!
//! Raw bytes are decoded into a [`crate::Message`], routed by declared type
//! through a static [`HandlerTable`], and written to the topic store, which
//! wakes every waiter registered on that topic.

mod codec;
mod dispatcher;

pub use codec::WireFormat;
pub use dispatcher::{DispatchReceipt, DispatchStats, Dispatcher, HandlerTable};
