//! Scripted in-memory gateway
//!
//! [`MockConnector`] hands out transports whose far end is a [`ServerEnd`]
//! controlled by the test. Upcoming opens can be scripted in advance so that
//! reconnect cycles run without the test having to answer each one.

use async_trait::async_trait;
use chord_gateway::{Connector, GatewayMessage, TransportError, TransportSink, TransportStream};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Something the server sends to the client
#[derive(Debug, Clone)]
enum Incoming {
    Frame(String),
    Close(u16),
}

/// What to do on an upcoming `open`
#[derive(Debug, Clone)]
pub enum Script {
    /// Fail to connect
    Refuse,
    /// Connect and immediately queue these frames for the client
    Frames(Vec<ScriptedFrame>),
}

/// Frame queued by a [`Script`]
#[derive(Debug, Clone)]
pub enum ScriptedFrame {
    Text(String),
    Close(u16),
}

impl ScriptedFrame {
    pub fn message(message: &GatewayMessage) -> Self {
        Self::Text(message.to_json().unwrap_or_default())
    }
}

/// Server side of one mock transport
#[derive(Clone)]
pub struct ServerEnd {
    url: String,
    to_client: mpsc::UnboundedSender<Incoming>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl ServerEnd {
    /// URL the client opened
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queue a raw text frame
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(Incoming::Frame(text.into()));
    }

    pub fn send(&self, message: &GatewayMessage) {
        self.send_text(message.to_json().unwrap_or_default());
    }

    pub fn hello(&self, heartbeat_interval: u64) {
        self.send(&GatewayMessage::hello(heartbeat_interval));
    }

    pub fn dispatch(&self, event: &str, seq: u64, data: Value) {
        self.send(&GatewayMessage::dispatch(event, seq, data));
    }

    /// Close the connection with a close code
    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(Incoming::Close(code));
    }

    /// Frames the client sent on this transport
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Sent frames decoded as JSON
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    /// Sent frames with the given op code
    pub fn sent_with_op(&self, op: u8) -> Vec<Value> {
        self.sent_json()
            .into_iter()
            .filter(|frame| frame["op"] == op)
            .collect()
    }

    /// Whether the client closed its sending half
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait until the client has sent at least `count` frames
    pub async fn wait_for_sent(&self, count: usize) -> Vec<String> {
        for _ in 0..1_000 {
            if self.sent.lock().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        self.sent()
    }
}

#[derive(Default)]
struct ConnectorState {
    scripts: VecDeque<Script>,
    opened: Vec<ServerEnd>,
    attempts: Vec<String>,
}

/// Connector producing in-memory transports
pub struct MockConnector {
    state: Mutex<ConnectorState>,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

/// Receives the server end of every transport the client opens
pub struct Transports {
    rx: mpsc::UnboundedReceiver<ServerEnd>,
}

impl Transports {
    /// Wait for the next opened transport
    pub async fn next(&mut self) -> ServerEnd {
        tokio::time::timeout(Duration::from_secs(60), self.rx.recv())
            .await
            .ok()
            .flatten()
            .expect("client did not open a transport")
    }
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, Transports) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            state: Mutex::new(ConnectorState::default()),
            accepted,
        });
        (connector, Transports { rx })
    }

    /// Script the next unscripted `open`
    pub fn script(&self, script: Script) {
        self.state.lock().scripts.push_back(script);
    }

    /// Script `count` refused opens
    pub fn refuse(&self, count: usize) {
        for _ in 0..count {
            self.script(Script::Refuse);
        }
    }

    /// Number of `open` calls, refused ones included
    pub fn open_attempts(&self) -> usize {
        self.state.lock().attempts.len()
    }

    /// URLs passed to `open`, in order
    pub fn urls(&self) -> Vec<String> {
        self.state.lock().attempts.clone()
    }

    /// Server ends of every transport opened so far
    pub fn opened(&self) -> Vec<ServerEnd> {
        self.state.lock().opened.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>), TransportError> {
        let script = {
            let mut state = self.state.lock();
            state.attempts.push(url.to_string());
            state.scripts.pop_front()
        };

        let frames = match script {
            Some(Script::Refuse) => {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            Some(Script::Frames(frames)) => frames,
            None => Vec::new(),
        };

        let (to_client, from_server) = mpsc::unbounded_channel();
        let server = ServerEnd {
            url: url.to_string(),
            to_client,
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        };

        for frame in frames {
            match frame {
                ScriptedFrame::Text(text) => server.send_text(text),
                ScriptedFrame::Close(code) => server.close(code),
            }
        }

        let sink = MockSink {
            sent: server.sent.clone(),
            closed: server.closed.clone(),
        };
        let stream = MockStream { rx: from_server };

        self.state.lock().opened.push(server.clone());
        let _ = self.accepted.send(server);

        Ok((Box::new(sink), Box::new(stream)))
    }
}

struct MockSink {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockStream {
    rx: mpsc::UnboundedReceiver<Incoming>,
}

#[async_trait]
impl TransportStream for MockStream {
    async fn receive(&mut self) -> Result<String, TransportError> {
        match self.rx.recv().await {
            Some(Incoming::Frame(text)) => Ok(text),
            Some(Incoming::Close(code)) => Err(TransportError::Closed { code }),
            None => Err(TransportError::Closed { code: 1006 }),
        }
    }
}

/// Let spawned tasks (writer, heartbeat, handlers) run
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
