//! MCP transport layer implementations.
//!
//! A transport delivers inbound text frames to a callback and accepts outbound
//! frames through `send`. Stdio and in-memory transports live here; the SSE
//! transport is in [`crate::http`].

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};

/// Callback invoked once per inbound frame, in delivery order.
pub type FrameHandler = Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

/// Largest inbound stdio frame accepted.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Time allowed for queued stdout frames to flush on disconnect.
const FLUSH_GRACE: Duration = Duration::from_secs(5);

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start delivering inbound frames to `on_message`.
    async fn connect(&self, on_message: FrameHandler) -> Result<()>;

    /// Queue an outbound frame. Sending on a disconnected transport is a no-op.
    fn send(&self, frame: String);

    /// Stop the transport.
    async fn disconnect(&self) -> Result<()>;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Stdio transport: one JSON frame per line on stdin/stdout.
pub struct StdioTransport {
    outgoing: Mutex<Option<mpsc::UnboundedSender<String>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    closed: watch::Sender<bool>,
}

impl StdioTransport {
    /// Create a new stdio transport.
    pub fn new() -> Self {
        Self {
            outgoing: Mutex::new(None),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            closed: watch::Sender::new(false),
        }
    }

    /// Resolves once stdin reaches EOF or the transport is disconnected.
    pub async fn wait_closed(&self) {
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn connect(&self, on_message: FrameHandler) -> Result<()> {
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        {
            let mut outgoing = lock(&self.outgoing);
            if outgoing.is_some() {
                return Err(Error::AlreadyConnected);
            }
            *outgoing = Some(outgoing_tx);
        }

        // Spawn stdin reader task
        let closed = self.closed.clone();
        let reader = tokio::spawn(async move {
            let codec = LinesCodec::new_with_max_length(MAX_FRAME_BYTES);
            let mut lines = FramedRead::new(tokio::io::stdin(), codec);

            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        trace!("Received: {}", trimmed);
                        on_message(trimmed.to_string()).await;
                    }
                    Err(LinesCodecError::MaxLineLengthExceeded) => {
                        warn!("Discarding frame longer than {} bytes", MAX_FRAME_BYTES);
                    }
                    Err(LinesCodecError::Io(e)) => {
                        error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }

            debug!("EOF on stdin, stopping transport");
            closed.send_replace(true);
        });
        *lock(&self.reader) = Some(reader);

        // Spawn stdout writer task; it exits once every sender is dropped
        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();

            while let Some(frame) = outgoing_rx.recv().await {
                trace!("Sending: {}", frame);
                if let Err(e) = stdout.write_all(frame.as_bytes()).await {
                    error!("Error writing to stdout: {}", e);
                    break;
                }
                if let Err(e) = stdout.write_all(b"\n").await {
                    error!("Error writing newline: {}", e);
                    break;
                }
                if let Err(e) = stdout.flush().await {
                    error!("Error flushing stdout: {}", e);
                    break;
                }
            }
        });
        *lock(&self.writer) = Some(writer);

        Ok(())
    }

    fn send(&self, frame: String) {
        match lock(&self.outgoing).as_ref() {
            Some(tx) => {
                if tx.send(frame).is_err() {
                    debug!("stdout writer has stopped; dropping frame");
                }
            }
            None => debug!("Transport not connected; dropping frame"),
        }
    }

    async fn disconnect(&self) -> Result<()> {
        lock(&self.outgoing).take();
        if let Some(reader) = lock(&self.reader).take() {
            reader.abort();
        }
        self.closed.send_replace(true);

        // Frames queued before the sender was dropped still reach stdout.
        let writer = lock(&self.writer).take();
        if let Some(writer) = writer {
            if tokio::time::timeout(FLUSH_GRACE, writer).await.is_err() {
                warn!("stdout writer did not drain within {:?}", FLUSH_GRACE);
            }
        }
        Ok(())
    }
}

/// In-process transport for embedding and tests.
///
/// Inbound frames are pushed with [`MemoryTransport::deliver`]; every sent
/// frame appears on the receiver returned by [`MemoryTransport::new`].
pub struct MemoryTransport {
    handler: Mutex<Option<FrameHandler>>,
    outgoing: mpsc::UnboundedSender<String>,
    connected: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (outgoing, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            handler: Mutex::new(None),
            outgoing,
            connected: AtomicBool::new(false),
        });
        (transport, rx)
    }

    /// Hand one inbound frame to the connected callback.
    pub async fn deliver(&self, frame: impl Into<String>) -> Result<()> {
        let handler = lock(&self.handler)
            .clone()
            .ok_or_else(|| Error::Transport("memory transport is not connected".to_string()))?;
        handler(frame.into()).await;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, on_message: FrameHandler) -> Result<()> {
        *lock(&self.handler) = Some(on_message);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn send(&self, frame: String) {
        if !self.is_connected() {
            debug!("Memory transport disconnected; dropping frame");
            return;
        }
        let _ = self.outgoing.send(frame);
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        lock(&self.handler).take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn test_memory_transport_round_trip() {
        let (transport, mut rx) = MemoryTransport::new();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();

        let handler: FrameHandler = Arc::new(move |frame: String| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(frame);
            }
            .boxed()
        });

        assert!(transport.deliver("early").await.is_err());
        transport.connect(handler).await.unwrap();
        assert!(transport.is_connected());

        transport.deliver("{\"a\":1}").await.unwrap();
        assert_eq!(seen_rx.recv().await.unwrap(), "{\"a\":1}");

        transport.send("out".to_string());
        assert_eq!(rx.recv().await.unwrap(), "out");
    }

    #[tokio::test]
    async fn test_memory_transport_send_after_disconnect_is_noop() {
        let (transport, mut rx) = MemoryTransport::new();
        let handler: FrameHandler = Arc::new(|_frame: String| async {}.boxed());
        transport.connect(handler).await.unwrap();
        transport.disconnect().await.unwrap();

        transport.send("late".to_string());
        assert!(rx.try_recv().is_err());
        assert!(transport.deliver("x").await.is_err());
    }

    #[tokio::test]
    async fn test_stdio_send_before_connect_is_noop() {
        let transport = StdioTransport::new();
        transport.send("dropped".to_string());
        transport.disconnect().await.unwrap();
        transport.wait_closed().await;
    }
}
