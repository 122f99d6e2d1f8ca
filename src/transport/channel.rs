//! In-process transport over a crossbeam channel.

use crate::error::{NotifyError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use super::{MessageSink, MessageSource};

/// Sending half of an in-process transport.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: Sender<Vec<u8>>,
}

/// Receiving half of an in-process transport.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: Receiver<Vec<u8>>,
}

/// Create an in-process transport. `None` capacity means unbounded; a
/// bounded sink blocks senders while the queue is full.
pub fn channel(capacity: Option<usize>) -> (ChannelSink, ChannelSource) {
    let (sender, receiver) = match capacity {
        Some(capacity) => bounded(capacity.max(1)),
        None => unbounded(),
    };
    (ChannelSink { sender }, ChannelSource { receiver })
}

impl ChannelSource {
    /// Messages queued and not yet received.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl MessageSink for ChannelSink {
    fn send(&self, raw: &[u8]) -> Result<()> {
        self.sender
            .send(raw.to_vec())
            .map_err(|_| NotifyError::TransportClosed)
    }
}

impl MessageSource for ChannelSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(raw) => Ok(Some(raw)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(NotifyError::TransportClosed),
        }
    }
}
