//! Background decoder: pulls raw messages from a source and dispatches them.

use crate::dispatch::Dispatcher;
use crate::error::{NotifyError, Result};
use crossbeam_channel::{bounded, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{panic_message, MessageSource};

/// How often the worker checks for a stop request while the source is idle.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Counters from a finished decoder worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub received: u64,
    pub dispatched: u64,
    /// Malformed or unknown-type messages that were logged and skipped.
    pub dropped: u64,
}

/// Named thread delivering messages to the dispatcher one at a time.
///
/// Per-message errors are logged and the worker keeps going. It exits when
/// stopped or when the source closes.
pub struct DecoderWorker {
    stop_tx: Option<Sender<()>>,
    join: Option<JoinHandle<PumpStats>>,
}

impl DecoderWorker {
    pub fn spawn<S>(source: S, dispatcher: Arc<Dispatcher>) -> Result<Self>
    where
        S: MessageSource + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let join = thread::Builder::new()
            .name("topicwatch-decoder".to_string())
            .spawn(move || {
                let mut stats = PumpStats::default();
                loop {
                    match stop_rx.try_recv() {
                        Err(TryRecvError::Empty) => {}
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                    }

                    let raw = match source.recv_timeout(POLL_INTERVAL) {
                        Ok(Some(raw)) => raw,
                        Ok(None) => continue,
                        Err(NotifyError::TransportClosed) => {
                            tracing::debug!("source closed, decoder exiting");
                            break;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "source failed, decoder exiting");
                            break;
                        }
                    };

                    stats.received += 1;
                    match dispatcher.dispatch(&raw) {
                        Ok(_) => stats.dispatched += 1,
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping inbound message");
                            stats.dropped += 1;
                        }
                    }
                }
                stats
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            join: Some(join),
        })
    }

    /// Ask the worker to exit after the message in hand.
    pub fn stop(&self) {
        if let Some(tx) = &self.stop_tx {
            let _ = tx.try_send(());
        }
    }

    /// Wait for the worker to exit. Without [`DecoderWorker::stop`] this
    /// returns once the source closes.
    ///
    /// A panic in the worker thread is resumed here.
    pub fn join(mut self) -> PumpStats {
        match self.wait() {
            Some(Ok(stats)) => stats,
            Some(Err(panic)) => std::panic::resume_unwind(panic),
            None => PumpStats::default(),
        }
    }

    fn wait(&mut self) -> Option<thread::Result<PumpStats>> {
        self.join.take().map(JoinHandle::join)
    }
}

impl Drop for DecoderWorker {
    fn drop(&mut self) {
        self.stop();
        self.stop_tx.take();
        if let Some(Err(panic)) = self.wait() {
            tracing::error!(panic = panic_message(panic.as_ref()), "decoder worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::transport::{channel, MessageSink};

    #[test]
    fn test_worker_dispatches_and_skips_bad_messages() {
        let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
        let (sink, source) = channel(None);

        sink.send(b"garbage").unwrap();
        sink.send(br#"{"type":"nope","payload":{}}"#).unwrap();
        sink.send(br#"{"type":"b","payload":{"3":8,"4":8}}"#).unwrap();
        drop(sink);

        // The source closes after the three queued messages.
        let stats = DecoderWorker::spawn(source, Arc::new(dispatcher))
            .unwrap()
            .join();

        assert_eq!(
            stats,
            PumpStats {
                received: 3,
                dispatched: 1,
                dropped: 2
            }
        );
        assert_eq!(store.value("b", "3").unwrap(), Some(8.0));
    }

    struct PanickingSource;

    impl MessageSource for PanickingSource {
        fn recv_timeout(&self, _timeout: Duration) -> Result<Option<Vec<u8>>> {
            panic!("source exploded");
        }
    }

    #[test]
    fn test_drop_swallows_worker_panic() {
        let (_store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
        let worker = DecoderWorker::spawn(PanickingSource, Arc::new(dispatcher)).unwrap();
        drop(worker);
    }

    #[test]
    #[should_panic(expected = "source exploded")]
    fn test_join_resumes_worker_panic() {
        let (_store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
        DecoderWorker::spawn(PanickingSource, Arc::new(dispatcher))
            .unwrap()
            .join();
    }

    #[test]
    fn test_worker_stops_on_request() {
        let (_store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();
        let (_sink, source) = channel(None);

        let worker = DecoderWorker::spawn(source, Arc::new(dispatcher)).unwrap();
        worker.stop();
        assert_eq!(worker.join(), PumpStats::default());
    }
}
