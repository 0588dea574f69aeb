//! Configuration, payload builders and a connection driver shared by the tests

use crate::mock::settle;
use chord_common::BotConfig;
use chord_gateway::{
    ConnectionConfig, Connector, GatewayConnection, GatewayError, GatewayHandle, GatewayMessage,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const TEST_TOKEN: &str = "test-token";
pub const GATEWAY_URL: &str = "wss://gateway.mock";
pub const RESUME_URL: &str = "wss://resume.mock";

/// Bot configuration pointing at the mock gateway
pub fn test_config() -> BotConfig {
    let mut config = BotConfig::new(TEST_TOKEN);
    config.gateway.url = Some(GATEWAY_URL.to_string());
    config.gateway.resume_delay_ms = 1_000;
    config.gateway.handshake_timeout_ms = 10_000;
    config
}

/// URL a connection built from [`test_config`] opens first
pub fn connect_url() -> String {
    test_config().gateway.connect_url(GATEWAY_URL)
}

pub fn connection(connector: Arc<dyn Connector>) -> GatewayConnection {
    GatewayConnection::new(ConnectionConfig::from_bot_config(&test_config()), connector)
}

pub fn ready_payload(session_id: &str, resume_url: Option<&str>) -> Value {
    let mut ready = json!({
        "v": 10,
        "user": { "id": "1000", "username": "chord-bot", "bot": true },
        "guilds": [{ "id": "42", "unavailable": true }],
        "session_id": session_id,
    });
    if let Some(url) = resume_url {
        ready["resume_gateway_url"] = Value::from(url);
    }
    ready
}

pub fn guild_payload(id: u64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "name": name,
        "channels": [{ "id": (id * 10).to_string(), "type": 0, "name": "general" }],
        "roles": [],
        "members": []
    })
}

pub fn channel_payload(id: u64, guild_id: u64, name: &str) -> Value {
    json!({ "id": id.to_string(), "type": 0, "guild_id": guild_id.to_string(), "name": name })
}

pub fn message_payload(id: u64, channel_id: u64, content: &str) -> Value {
    json!({
        "id": id.to_string(),
        "channel_id": channel_id.to_string(),
        "author": { "id": "7", "username": "someone" },
        "content": content,
        "timestamp": "2024-01-01T00:00:00+00:00"
    })
}

/// Output of a connection running in the background
pub type Payload = Result<GatewayMessage, GatewayError>;

/// A connection polled by a background task
pub struct Driven {
    pub handle: GatewayHandle,
    payloads: mpsc::UnboundedReceiver<Payload>,
    task: JoinHandle<()>,
}

/// Poll `connection` in the background until its stream ends
pub fn drive(connection: GatewayConnection) -> Driven {
    let handle = connection.handle();
    let (tx, payloads) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let stream = connection.into_stream();
        futures::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            if tx.send(item).is_err() {
                break;
            }
        }
    });

    Driven { handle, payloads, task }
}

impl Driven {
    /// Next payload or terminal error; `None` once the run ended
    pub async fn next(&mut self) -> Option<Payload> {
        tokio::time::timeout(Duration::from_secs(600), self.payloads.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next dispatch with the given tag, skipping everything else
    pub async fn next_dispatch(&mut self, event: &str) -> Option<GatewayMessage> {
        loop {
            match self.next().await? {
                Ok(message) if message.is_dispatch_of(event) => return Some(message),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Drain until the run ends; returns the terminal error if there was one
    pub async fn finish(&mut self) -> Option<GatewayError> {
        let mut error = None;
        while let Some(item) = self.next().await {
            if let Err(e) = item {
                error = Some(e);
            }
        }
        error
    }

    /// Whether the background task has returned
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Poll `condition` until it holds, letting time pass between checks
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..5_000 {
        if condition() {
            return true;
        }
        settle().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}
