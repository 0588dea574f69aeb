//! Gateway connection state machine
//!
//! Drives one session: opens the transport, answers Hello with Identify or
//! Resume, classifies inbound frames and applies the reconnect policy.
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> AWAITING_HELLO -> IDENTIFYING|RESUMING -> CONNECTED
//!                                    ^                                      |
//!                                    +------------ RECONNECTING <-----------+
//!                                                       |
//!                                                       v
//!                                                    FAILED
//! ```

use super::handle::Shared;
use super::{ConnectionState, GatewayHandle, SessionState, WriterHandle};
use crate::error::{GatewayError, TransportError};
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload, IdentifyProperties, OpCode, PresencePayload};
use crate::transport::{Connector, TransportStream};
use chord_common::{BotConfig, GatewaySettings};
use chord_core::Intents;
use futures::Stream;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Settings for one gateway connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub token: String,
    /// `[shard_id, shard_count]`
    pub shard: [u32; 2],
    pub intents: Intents,
    pub large_threshold: u32,
    pub properties: IdentifyProperties,
    pub gateway: GatewaySettings,
}

impl ConnectionConfig {
    /// Defaults for a single unsharded connection
    pub fn new(token: impl Into<String>) -> Self {
        Self::from_bot_config(&BotConfig::new(token))
    }

    pub fn from_bot_config(config: &BotConfig) -> Self {
        Self {
            token: config.token.clone(),
            shard: config.shard(),
            intents: config.intents,
            large_threshold: config.large_threshold,
            properties: IdentifyProperties::default(),
            gateway: config.gateway.clone(),
        }
    }
}

/// Outcome of one resume cycle
enum Attempt {
    /// The gateway answered; the receive loop takes over
    Resumed,
    /// `stop()` was called while resuming
    Stopped,
    /// Transport failed or timed out; worth another try
    Failed(TransportError),
}

/// Connection to the gateway
///
/// Owns the receiving half of the transport. Sends go through the writer task,
/// so [`GatewayHandle`]s can be used from other tasks while
/// [`next_payload`](Self::next_payload) is awaiting a frame.
pub struct GatewayConnection {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    config: ConnectionConfig,
    url: Option<String>,
    identify_override: Option<GatewayMessage>,
    stream: Option<Box<dyn TransportStream>>,
    stop_rx: watch::Receiver<bool>,
    pending: VecDeque<GatewayMessage>,
}

impl GatewayConnection {
    pub fn new(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        let [shard_id, shard_count] = config.shard;
        let session = SessionState::new(config.token.clone(), shard_id, shard_count);
        let shared = Arc::new(Shared::new(session, PresencePayload::default()));
        let stop_rx = shared.subscribe_stop();

        Self {
            shared,
            connector,
            config,
            url: None,
            identify_override: None,
            stream: None,
            stop_rx,
            pending: VecDeque::new(),
        }
    }

    /// Get a handle for use from other tasks
    pub fn handle(&self) -> GatewayHandle {
        GatewayHandle::new(self.shared.clone())
    }

    pub fn session(&self) -> &SessionState {
        &self.shared.session
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the transport to `url` and wait for Hello on the next poll
    ///
    /// `identify_override` replaces the default Identify message whenever a
    /// fresh session has to be started. Calling this again after a terminal
    /// failure starts over.
    pub async fn connect(
        &mut self,
        url: &str,
        identify_override: Option<GatewayMessage>,
    ) -> Result<(), GatewayError> {
        self.drop_transport();
        self.shared.reset_for_connect();
        self.stop_rx = self.shared.subscribe_stop();
        self.pending.clear();
        self.url = Some(url.to_string());
        self.identify_override = identify_override;

        tracing::info!(url = %url, shard = ?self.config.shard, "Connecting to gateway");
        self.shared.set_state(ConnectionState::Connecting);

        match self.open_transport(url).await {
            Ok(true) => {
                self.shared.set_state(ConnectionState::AwaitingHello);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => Err(self.shared.fail(e.into())),
        }
    }

    /// Send a message over the live transport
    pub async fn send(&self, message: &GatewayMessage) -> Result<(), TransportError> {
        self.shared.send(message).await
    }

    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Replace the presence sent with the next Identify
    pub fn set_presence(&self, presence: PresencePayload) {
        self.shared.update_presence(|current| *current = presence);
    }

    /// Wait for the next decoded payload
    ///
    /// Every payload is yielded after the connection has acted on it.
    /// `Ok(None)` means the run ended without error: `stop()` was called or
    /// the transport closed with no session to resume. Once the connection
    /// has failed, every call returns the stored error.
    pub async fn next_payload(&mut self) -> Result<Option<GatewayMessage>, GatewayError> {
        loop {
            if let Some(error) = self.shared.failure() {
                return Err(error);
            }
            if self.shared.is_stopping() {
                self.drop_transport();
                return Ok(None);
            }
            if let Some(message) = self.pending.pop_front() {
                return Ok(Some(message));
            }

            let Some(stream) = self.stream.as_mut() else {
                return Ok(None);
            };

            let received = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop_rx) => continue,
                received = stream.receive() => received,
            };

            match received {
                Ok(text) => {
                    let message = match GatewayMessage::from_json(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping undecodable frame");
                            continue;
                        }
                    };

                    tracing::trace!(op = %message.op, seq = ?message.s, event = ?message.t, "Received payload");
                    self.handle_payload(&message).await?;
                    return Ok(Some(message));
                }
                Err(e) => self.on_close(e.close_code()).await?,
            }
        }
    }

    /// Turn the connection into a stream of payloads
    ///
    /// The stream ends after yielding a terminal error.
    pub fn into_stream(self) -> impl Stream<Item = Result<GatewayMessage, GatewayError>> + Send {
        futures::stream::unfold(Some(self), |connection| async move {
            let mut connection = connection?;
            match connection.next_payload().await {
                Ok(Some(message)) => Some((Ok(message), Some(connection))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    // === Inbound handling ===

    async fn handle_payload(&mut self, message: &GatewayMessage) -> Result<(), GatewayError> {
        if let Some(seq) = message.s {
            self.shared.session.observe_sequence(seq);
        }

        match message.op {
            OpCode::Hello => match message.as_hello() {
                Some(hello) => self.on_hello(hello.heartbeat_interval).await,
                None => tracing::warn!("Hello without a heartbeat interval"),
            },
            OpCode::Dispatch => self.on_dispatch(message),
            OpCode::Heartbeat => self.beat_now().await,
            OpCode::HeartbeatAck => {
                tracing::trace!("Heartbeat acknowledged");
                self.shared.ack_heartbeat();
            }
            OpCode::Reconnect => {
                tracing::info!("Gateway requested a reconnect");
                self.reconnect().await?;
            }
            OpCode::InvalidSession => {
                let resumable = message.as_invalid_session().unwrap_or(false);
                self.on_invalid_session(resumable).await;
            }
            op => tracing::debug!(op = %op, "Ignoring unexpected op code"),
        }
        Ok(())
    }

    async fn on_hello(&mut self, interval_ms: u64) {
        if self.shared.heartbeat_running() {
            tracing::debug!("Duplicate hello on a live transport ignored");
            return;
        }

        let interval = Duration::from_millis(interval_ms);
        if !self.shared.arm_heartbeat(interval) {
            tracing::warn!("Hello received without an open transport");
            return;
        }

        tracing::debug!(heartbeat_interval_ms = interval_ms, "Hello received");
        self.send_handshake().await;
    }

    fn on_dispatch(&self, message: &GatewayMessage) {
        match message.t.as_deref() {
            Some("READY") => {
                let data = message.d.as_ref();
                let session_id = data
                    .and_then(|d| d.get("session_id"))
                    .and_then(|v| v.as_str());
                let resume_url = data
                    .and_then(|d| d.get("resume_gateway_url"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string);

                match session_id {
                    Some(session_id) => {
                        tracing::info!(session_id = %session_id, "Session established");
                        self.shared.session.set_session(session_id, resume_url);
                    }
                    None => tracing::warn!("READY without a session id"),
                }
                self.shared.set_state(ConnectionState::Connected);
            }
            Some("RESUMED") => {
                tracing::info!(
                    seq = self.shared.session.last_sequence(),
                    "Session resumed"
                );
                self.shared.set_state(ConnectionState::Connected);
            }
            _ => {}
        }
    }

    async fn on_invalid_session(&mut self, resumable: bool) {
        if resumable && self.shared.session.is_resumable() {
            tracing::warn!("Session invalidated, resuming again");
        } else {
            tracing::warn!("Session invalidated, starting a new one");
            self.shared.session.clear_session_id();
            self.shared.session.reset_sequence();
        }
        self.send_handshake().await;
    }

    /// Send Resume when there is a session to resume, Identify otherwise
    async fn send_handshake(&self) {
        let message = match self.shared.session.resume_payload() {
            Some(payload) if self.shared.session.is_resumable() => {
                tracing::info!(session_id = %payload.session_id, seq = payload.seq, "Sending resume");
                self.shared.set_state(ConnectionState::Resuming);
                GatewayMessage::resume(&payload)
            }
            _ => {
                tracing::info!("Sending identify");
                self.shared.set_state(ConnectionState::Identifying);
                self.identify_message()
            }
        };

        if let Err(e) = self.shared.send(&message).await {
            tracing::warn!(error = %e, op = %message.op, "Failed to send handshake");
        }
    }

    fn identify_message(&self) -> GatewayMessage {
        if let Some(message) = &self.identify_override {
            return message.clone();
        }

        let payload = IdentifyPayload {
            token: self.shared.session.token().to_string(),
            properties: self.config.properties.clone(),
            large_threshold: self.config.large_threshold,
            presence: Some(self.shared.presence()),
            intents: self.config.intents,
            shard: self.shared.session.shard(),
        };
        GatewayMessage::identify(&payload)
    }

    async fn beat_now(&self) {
        let seq = self.shared.session.last_sequence();
        tracing::debug!(seq, "Heartbeat requested by gateway");
        if let Err(e) = self.shared.send(&GatewayMessage::heartbeat(seq)).await {
            tracing::warn!(error = %e, "Failed to send requested heartbeat");
        }
    }

    // === Transport lifecycle ===

    /// Open and install a transport; `Ok(false)` if stopped while connecting
    ///
    /// Opening is bounded by the handshake timeout.
    async fn open_transport(&mut self, url: &str) -> Result<bool, TransportError> {
        let timeout = self.config.gateway.handshake_timeout();
        let (sink, stream) = tokio::select! {
            biased;
            () = stop_requested(&mut self.stop_rx) => return Ok(false),
            opened = tokio::time::timeout(timeout, self.connector.open(url)) => {
                opened.unwrap_or(Err(TransportError::Timeout))?
            }
        };

        self.shared.attach_writer(WriterHandle::spawn(sink));
        self.stream = Some(stream);
        Ok(true)
    }

    fn drop_transport(&mut self) {
        self.shared.detach_transport();
        self.stream = None;
    }

    async fn on_close(&mut self, code: u16) -> Result<(), GatewayError> {
        self.drop_transport();

        if self.shared.is_stopping() {
            return Ok(());
        }

        let close = CloseCode::from_u16(code);
        tracing::warn!(
            close_code = code,
            reason = close.map_or("unknown", CloseCode::description),
            "Gateway connection closed"
        );

        if close.is_some_and(CloseCode::is_authentication_failure) {
            return Err(self.shared.fail(GatewayError::Authentication(format!(
                "gateway rejected the token ({code})"
            ))));
        }

        if close.is_some_and(CloseCode::is_recoverable) {
            return self.reconnect().await;
        }

        Err(self.shared.fail(GatewayError::Connectivity(format!(
            "gateway closed with code {code}"
        ))))
    }

    /// Reconnect policy: resume an established session, otherwise end quietly
    async fn reconnect(&mut self) -> Result<(), GatewayError> {
        self.drop_transport();

        if !self.shared.session.is_resumable() {
            tracing::info!("No session to resume, stopping");
            self.shared.session.clear_session_id();
            self.shared.set_state(ConnectionState::Disconnected);
            return Ok(());
        }

        self.shared.set_state(ConnectionState::Reconnecting);
        let attempts = self.config.gateway.max_resume_attempts;
        let delay = self.config.gateway.resume_delay();

        for attempt in 1..=attempts {
            if self.shared.is_stopping() {
                return Ok(());
            }

            match self.try_resume(attempt).await? {
                Attempt::Resumed | Attempt::Stopped => return Ok(()),
                Attempt::Failed(e) => {
                    tracing::warn!(attempt, max_attempts = attempts, error = %e, "Resume attempt failed");
                    self.drop_transport();
                    self.shared.set_state(ConnectionState::Reconnecting);

                    if attempt < attempts && self.pause(delay).await {
                        return Ok(());
                    }
                }
            }
        }

        Err(self.shared.fail(GatewayError::Connectivity(format!(
            "failed to resume after {attempts} attempts"
        ))))
    }

    /// One resume cycle: open, wait for Hello, send Resume, wait for an answer
    ///
    /// Frames seen along the way are queued for the caller.
    async fn try_resume(&mut self, attempt: u32) -> Result<Attempt, GatewayError> {
        let url = self.resume_target();
        tracing::info!(attempt, url = %url, "Attempting to resume session");

        match self.open_transport(&url).await {
            Ok(true) => {}
            Ok(false) => return Ok(Attempt::Stopped),
            Err(e) => return Ok(Attempt::Failed(e)),
        }
        self.shared.set_state(ConnectionState::AwaitingHello);

        let timeout = self.config.gateway.handshake_timeout();

        loop {
            let Some(stream) = self.stream.as_mut() else {
                return Ok(Attempt::Failed(TransportError::NotConnected));
            };

            let received = tokio::select! {
                biased;
                () = stop_requested(&mut self.stop_rx) => return Ok(Attempt::Stopped),
                received = tokio::time::timeout(timeout, stream.receive()) => {
                    received.unwrap_or(Err(TransportError::Timeout))
                }
            };

            let text = match received {
                Ok(text) => text,
                Err(e) => {
                    let code = e.close_code();
                    if CloseCode::from_u16(code).is_some_and(CloseCode::is_authentication_failure) {
                        self.drop_transport();
                        return Err(self.shared.fail(GatewayError::Authentication(format!(
                            "gateway rejected the token ({code})"
                        ))));
                    }
                    return Ok(Attempt::Failed(e));
                }
            };

            let message = match GatewayMessage::from_json(&text) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable frame");
                    continue;
                }
            };

            if let Some(seq) = message.s {
                self.shared.session.observe_sequence(seq);
            }

            let resumed = match message.op {
                OpCode::Hello => {
                    if let Some(hello) = message.as_hello() {
                        self.on_hello(hello.heartbeat_interval).await;
                    }
                    false
                }
                OpCode::Dispatch => {
                    self.on_dispatch(&message);
                    true
                }
                OpCode::InvalidSession => {
                    let resumable = message.as_invalid_session().unwrap_or(false);
                    self.on_invalid_session(resumable).await;
                    // A fresh identify hands over to the receive loop
                    !self.shared.session.is_resumable()
                }
                OpCode::Heartbeat => {
                    self.beat_now().await;
                    false
                }
                OpCode::HeartbeatAck => {
                    self.shared.ack_heartbeat();
                    false
                }
                OpCode::Reconnect => {
                    self.pending.push_back(message);
                    return Ok(Attempt::Failed(TransportError::Closed {
                        code: CloseCode::UnknownError.as_u16(),
                    }));
                }
                _ => false,
            };

            self.pending.push_back(message);
            if resumed {
                return Ok(Attempt::Resumed);
            }
        }
    }

    /// URL for resuming: the one announced by READY, else the original
    fn resume_target(&self) -> String {
        match self.shared.session.resume_url() {
            Some(base) => self.config.gateway.connect_url(&base),
            None => self.url.clone().unwrap_or_default(),
        }
    }

    /// Sleep between attempts; returns true if stopped meanwhile
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            () = stop_requested(&mut self.stop_rx) => true,
            () = tokio::time::sleep(delay) => false,
        }
    }
}

/// Resolves once `stop()` has been called
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    // The sender lives in `Shared`, so this only errors if the connection is gone
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

impl std::fmt::Debug for GatewayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConnection")
            .field("url", &self.url)
            .field("state", &self.state())
            .field("session", &self.shared.session)
            .field("pending", &self.pending.len())
            .finish()
    }
}
