//! Transport collaborators around the dispatcher.
//!
//! The core never sends anything. These pieces move raw messages in
//! ([`MessageSource`]) and produce stimulus ([`MessageSink`], [`Generator`]):
//! - [`channel`]: in-process queue
//! - [`UdpSource`] / [`UdpSink`]: one datagram per message
//! - [`DecoderWorker`]: hands each received message to the dispatcher
//! - [`Generator`]: sends a message per stream at a fixed rate, doubling
//!   every payload value after each send

mod channel;
mod generator;
mod udp;
mod worker;

use crate::error::Result;
use std::any::Any;
use std::time::Duration;

pub use channel::{channel, ChannelSink, ChannelSource};
pub use generator::{Generator, GeneratorHandle, GeneratorStream};
pub use udp::{UdpSink, UdpSource};
pub use worker::{DecoderWorker, PumpStats};

/// Delivers raw inbound messages one at a time.
pub trait MessageSource {
    /// Wait up to `timeout` for the next message. `Ok(None)` means nothing
    /// arrived; [`crate::NotifyError::TransportClosed`] means nothing will.
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>>;
}

/// Accepts raw outbound messages.
pub trait MessageSink {
    fn send(&self, raw: &[u8]) -> Result<()>;
}

/// Text of a panic payload from a joined thread.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
