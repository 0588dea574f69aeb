//! Outbound frame writer
//!
//! A single task owns the transport's sending half. Heartbeats, handshakes and
//! presence updates all hand their frames to it through a channel, so sends
//! from other tasks never race each other on the socket.

use crate::error::TransportError;
use crate::protocol::GatewayMessage;
use crate::transport::TransportSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Channel buffer size for outgoing frames
const FRAME_BUFFER_SIZE: usize = 100;

/// Handle to the writer task of one transport
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::Sender<String>,
    open: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
}

impl WriterHandle {
    /// Spawn the writer task for a freshly opened sink
    pub fn spawn(sink: Box<dyn TransportSink>) -> Self {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER_SIZE);
        let open = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());

        tokio::spawn(run_writer(sink, rx, open.clone(), shutdown.clone()));

        Self { tx, open, shutdown }
    }

    /// Queue a message for sending
    pub async fn send(&self, message: &GatewayMessage) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }

        let json = message
            .to_json()
            .map_err(|e| TransportError::Send(e.to_string()))?;

        self.tx
            .send(json)
            .await
            .map_err(|_| TransportError::NotConnected)
    }

    /// Close the transport; later sends fail with `NotConnected`
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.shutdown.notify_one();
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterHandle")
            .field("open", &self.is_open())
            .finish()
    }
}

async fn run_writer(
    mut sink: Box<dyn TransportSink>,
    mut rx: mpsc::Receiver<String>,
    open: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.notified() => break,
            frame = rx.recv() => frame,
        };

        let Some(frame) = frame else { break };

        if let Err(e) = sink.send(frame).await {
            tracing::warn!(error = %e, "Failed to send frame");
            break;
        }
    }

    open.store(false, Ordering::SeqCst);

    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "Error while closing transport");
    }
    tracing::trace!("Writer task finished");
}
