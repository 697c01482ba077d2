//! JSON-lines channel: one `RawMessage` per input line, one result chunk per
//! output line.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use hybro_bridge::{Channel, ChannelError, MessageChannel, MessageListener};
use hybro_protocol::RawMessage;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Longest accepted input line.
pub const MAX_LINE_LENGTH: usize = 64 * 1024 * 1024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Listeners {
    entries: Mutex<Vec<(String, MessageListener)>>,
}

impl MessageChannel for Listeners {
    fn add_listener(&self, category: &str, listener: MessageListener) {
        lock(&self.entries).push((category.to_string(), listener));
    }

    fn remove_listener(&self, category: &str, listener: &MessageListener) {
        lock(&self.entries)
            .retain(|(existing, entry)| !(existing == category && entry == listener));
    }
}

/// Line-oriented [`Channel`] over an async reader/writer pair.
///
/// Outgoing payloads are queued and written by a background task, so `send`
/// never blocks the bridge.
#[derive(Clone)]
pub struct LineChannel {
    category: String,
    listeners: Arc<Listeners>,
    outgoing: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

impl LineChannel {
    /// Create the channel and spawn its writer task. The task finishes once
    /// [`LineChannel::close`] has been called and the queue is drained.
    pub fn spawn<W>(category: impl Into<String>, writer: W) -> (Self, JoinHandle<io::Result<()>>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            category: category.into(),
            listeners: Arc::new(Listeners::default()),
            outgoing: Arc::new(Mutex::new(Some(tx))),
        };
        (channel, tokio::spawn(write_lines(writer, rx)))
    }

    /// Read lines from `reader` and deliver each to the listeners, until EOF.
    ///
    /// Lines that are not a valid message are logged and skipped.
    pub async fn pump<R>(&self, reader: R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let mut delivered = 0u64;

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    tracing::warn!(max = MAX_LINE_LENGTH, "skipping oversized input line");
                    continue;
                }
                Err(LinesCodecError::Io(err)) => return Err(err),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<RawMessage>(line) {
                Ok(message) => {
                    self.deliver(message);
                    delivered += 1;
                }
                Err(err) => tracing::warn!(error = %err, "skipping malformed input line"),
            }
        }

        tracing::debug!(delivered, "input closed");
        Ok(delivered)
    }

    fn deliver(&self, message: RawMessage) {
        let targets: Vec<MessageListener> = lock(&self.listeners.entries)
            .iter()
            .filter(|(category, _)| *category == self.category)
            .map(|(_, listener)| listener.clone())
            .collect();
        if targets.is_empty() {
            tracing::debug!(command_id = %message.id, "no listener for input message");
        }
        for listener in &targets {
            listener.call(message.clone());
        }
    }

    /// Stop accepting output. Queued lines are still written.
    pub fn close(&self) {
        lock(&self.outgoing).take();
    }
}

impl Channel for LineChannel {
    fn message_channel(&self) -> Option<Arc<dyn MessageChannel>> {
        if lock(&self.outgoing).is_none() {
            return None;
        }
        Some(Arc::clone(&self.listeners) as Arc<dyn MessageChannel>)
    }

    fn send(&self, message: Value) -> Result<(), ChannelError> {
        let line = serde_json::to_string(&message)?;
        let outgoing = lock(&self.outgoing);
        let tx = outgoing.as_ref().ok_or(ChannelError::Closed)?;
        tx.send(line).map_err(|_| ChannelError::Closed)
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
