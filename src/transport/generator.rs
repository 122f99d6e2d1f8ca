//! Stimulus generator: periodic messages at per-stream rates.

use crate::dispatch::WireFormat;
use crate::error::{NotifyError, Result};
use crate::types::{Message, Payload};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{panic_message, MessageSink};

/// One periodically sent message.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorStream {
    message: Message,
    frequency_hz: f64,
}

impl GeneratorStream {
    pub fn new(message: Message, frequency_hz: f64) -> Result<Self> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(NotifyError::InvalidConfig(format!(
                "stream {:?}: frequency must be positive, got {frequency_hz}",
                message.message_type
            )));
        }
        Ok(Self {
            message,
            frequency_hz,
        })
    }

    pub fn message_type(&self) -> &str {
        &self.message.message_type
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frequency_hz)
    }

    /// The message to send now. Every payload value doubles afterwards.
    pub fn next_message(&mut self) -> Message {
        let current = self.message.clone();
        for (_, value) in self.message.payload.iter_mut() {
            *value += *value;
        }
        current
    }
}

/// Sends each stream's message on its own thread at the stream's rate.
#[derive(Clone, Debug)]
pub struct Generator {
    streams: Vec<GeneratorStream>,
    format: WireFormat,
}

impl Generator {
    pub fn new(streams: Vec<GeneratorStream>, format: WireFormat) -> Self {
        Self { streams, format }
    }

    /// `a` at 10 Hz, `b` at 5 Hz and `c` at 1 Hz, every value starting at 1.
    pub fn demo_streams() -> Result<Vec<GeneratorStream>> {
        Ok(vec![
            GeneratorStream::new(
                Message::new("a", Payload::new().with("1", 1.0).with("2", 1.0)),
                10.0,
            )?,
            GeneratorStream::new(
                Message::new("b", Payload::new().with("3", 1.0).with("4", 1.0)),
                5.0,
            )?,
            GeneratorStream::new(
                Message::new("c", Payload::new().with("5", 1.0).with("6", 1.0)),
                1.0,
            )?,
        ])
    }

    pub fn streams(&self) -> &[GeneratorStream] {
        &self.streams
    }

    /// Start one sender thread per stream.
    pub fn spawn<K>(self, sink: Arc<K>) -> Result<GeneratorHandle>
    where
        K: MessageSink + Send + Sync + ?Sized + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let format = self.format;
        let mut joins = Vec::with_capacity(self.streams.len());

        for stream in self.streams {
            let name = format!("topicwatch-gen-{}", stream.message_type());
            let sink = Arc::clone(&sink);
            let stop_rx = stop_rx.clone();
            let join = thread::Builder::new()
                .name(name)
                .spawn(move || run_stream(stream, format, sink.as_ref(), &stop_rx))?;
            joins.push(join);
        }

        Ok(GeneratorHandle {
            stop_tx: Some(stop_tx),
            joins,
        })
    }
}

fn run_stream<K>(
    mut stream: GeneratorStream,
    format: WireFormat,
    sink: &K,
    stop_rx: &Receiver<()>,
) -> (String, u64)
where
    K: MessageSink + ?Sized,
{
    let period = stream.period();
    let mut sent = 0;

    loop {
        let message = stream.next_message();
        let result = format.encode(&message).and_then(|raw| sink.send(&raw));
        if let Err(e) = result {
            tracing::warn!(stream = %message.message_type, error = %e, "generator stream stopped");
            break;
        }
        sent += 1;

        match stop_rx.recv_timeout(period) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    (stream.message_type().to_string(), sent)
}

/// Running generator. Dropping it stops every stream.
pub struct GeneratorHandle {
    stop_tx: Option<Sender<()>>,
    joins: Vec<JoinHandle<(String, u64)>>,
}

impl GeneratorHandle {
    /// Stop all streams and return how many messages each sent.
    ///
    /// A panic in a stream thread is resumed here.
    pub fn stop(mut self) -> Vec<(String, u64)> {
        self.shutdown()
            .into_iter()
            .map(|joined| match joined {
                Ok(sent) => sent,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    }

    fn shutdown(&mut self) -> Vec<thread::Result<(String, u64)>> {
        // Disconnecting the stop channel wakes every stream.
        self.stop_tx.take();
        self.joins.drain(..).map(JoinHandle::join).collect()
    }
}

impl Drop for GeneratorHandle {
    fn drop(&mut self) {
        for joined in self.shutdown() {
            if let Err(panic) = joined {
                tracing::error!(panic = panic_message(panic.as_ref()), "generator stream panicked");
            }
        }
    }
}
