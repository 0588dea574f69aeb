//! State shared between the receive loop and its handles

use super::{ConnectionState, HeartbeatTask, SessionState, WriterHandle};
use crate::error::{GatewayError, TransportError};
use crate::protocol::{GatewayMessage, PresencePayload};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Everything the receive loop and other tasks both touch
///
/// Guards are never held across an await point.
pub(crate) struct Shared {
    pub(crate) session: Arc<SessionState>,
    writer: Mutex<Option<WriterHandle>>,
    heartbeat: Mutex<Option<HeartbeatTask>>,
    heartbeat_interval: AtomicU64,
    state: RwLock<ConnectionState>,
    stopping: AtomicBool,
    stop_signal: watch::Sender<bool>,
    failure: RwLock<Option<GatewayError>>,
    presence: RwLock<PresencePayload>,
}

impl Shared {
    pub(crate) fn new(session: SessionState, presence: PresencePayload) -> Self {
        let (stop_signal, _) = watch::channel(false);
        Self {
            session: Arc::new(session),
            writer: Mutex::new(None),
            heartbeat: Mutex::new(None),
            heartbeat_interval: AtomicU64::new(0),
            state: RwLock::new(ConnectionState::Disconnected),
            stopping: AtomicBool::new(false),
            stop_signal,
            failure: RwLock::new(None),
            presence: RwLock::new(presence),
        }
    }

    // === State ===

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_signal.subscribe()
    }

    /// Clear the stop flag and any stored failure for a fresh run
    pub(crate) fn reset_for_connect(&self) {
        self.stopping.store(false, Ordering::SeqCst);
        self.stop_signal.send_replace(false);
        *self.failure.write() = None;
    }

    pub(crate) fn failure(&self) -> Option<GatewayError> {
        self.failure.read().clone()
    }

    /// Enter `Failed`, tearing the transport down and storing the error
    ///
    /// The session cannot be resumed afterwards; the next `connect` identifies.
    pub(crate) fn fail(&self, error: GatewayError) -> GatewayError {
        tracing::error!(error = %error, code = error.error_code(), "Gateway connection failed");
        self.detach_transport();
        self.session.clear_session_id();
        *self.failure.write() = Some(error.clone());
        self.set_state(ConnectionState::Failed);
        error
    }

    // === Transport ===

    pub(crate) fn writer(&self) -> Option<WriterHandle> {
        self.writer.lock().clone()
    }

    /// Install the writer of a new transport, closing any previous one
    pub(crate) fn attach_writer(&self, writer: WriterHandle) {
        if let Some(previous) = self.writer.lock().replace(writer) {
            previous.close();
        }
    }

    /// Close the transport and cancel the heartbeat
    pub(crate) fn detach_transport(&self) {
        if let Some(writer) = self.writer.lock().take() {
            writer.close();
        }
        self.cancel_heartbeat();
    }

    pub(crate) async fn send(&self, message: &GatewayMessage) -> Result<(), TransportError> {
        let writer = self.writer().ok_or(TransportError::NotConnected)?;
        writer.send(message).await
    }

    // === Heartbeat ===

    /// Start the heartbeat for the current transport
    ///
    /// Returns false when one is already running, so a repeated Hello on the
    /// same transport leaves the existing loop alone.
    pub(crate) fn arm_heartbeat(&self, interval: Duration) -> bool {
        let mut heartbeat = self.heartbeat.lock();
        if heartbeat.as_ref().is_some_and(HeartbeatTask::is_running) {
            return false;
        }

        let Some(writer) = self.writer() else {
            return false;
        };

        self.heartbeat_interval
            .store(interval.as_millis() as u64, Ordering::SeqCst);
        *heartbeat = Some(HeartbeatTask::spawn(interval, writer, self.session.clone()));
        true
    }

    pub(crate) fn cancel_heartbeat(&self) {
        if let Some(task) = self.heartbeat.lock().take() {
            task.cancel();
        }
    }

    pub(crate) fn ack_heartbeat(&self) {
        if let Some(task) = self.heartbeat.lock().as_ref() {
            task.ack();
        }
    }

    pub(crate) fn heartbeat_running(&self) -> bool {
        self.heartbeat
            .lock()
            .as_ref()
            .is_some_and(HeartbeatTask::is_running)
    }

    pub(crate) fn heartbeat_interval(&self) -> Option<Duration> {
        match self.heartbeat_interval.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    // === Presence ===

    pub(crate) fn presence(&self) -> PresencePayload {
        self.presence.read().clone()
    }

    pub(crate) fn update_presence<F>(&self, update: F) -> PresencePayload
    where
        F: FnOnce(&mut PresencePayload),
    {
        let mut presence = self.presence.write();
        update(&mut presence);
        presence.clone()
    }

    /// Stop the connection; safe to call repeatedly and from any task
    pub(crate) fn stop(&self) {
        let first = !self.stopping.swap(true, Ordering::SeqCst);

        self.session.clear_session_id();
        self.detach_transport();
        self.stop_signal.send_replace(true);

        if self.state() != ConnectionState::Failed {
            self.set_state(ConnectionState::Disconnected);
        }

        if first {
            tracing::info!("Gateway connection stopped");
        }
    }
}

/// Cloneable handle for controlling a connection from other tasks
#[derive(Clone)]
pub struct GatewayHandle {
    shared: Arc<Shared>,
}

impl GatewayHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Send a message over the live transport
    pub async fn send(&self, message: &GatewayMessage) -> Result<(), TransportError> {
        self.shared.send(message).await
    }

    /// Change the presence and announce it when connected
    ///
    /// The new presence is kept either way and sent with the next Identify.
    pub async fn update_presence<F>(&self, update: F) -> Result<(), TransportError>
    where
        F: FnOnce(&mut PresencePayload) + Send,
    {
        let presence = self.shared.update_presence(update);

        if self.shared.state() != ConnectionState::Connected {
            tracing::debug!("Not connected, presence will be sent with the next identify");
            return Ok(());
        }

        self.shared
            .send(&GatewayMessage::presence_update(&presence))
            .await
    }

    /// Stop the connection
    ///
    /// Cancels the heartbeat, forgets the session, closes the transport and
    /// wakes the receive loop, which then ends.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state() == ConnectionState::Connected
    }

    pub fn session_id(&self) -> Option<String> {
        self.shared.session.session_id()
    }

    pub fn last_sequence(&self) -> u64 {
        self.shared.session.last_sequence()
    }

    /// Error that put the connection into `Failed`
    pub fn last_error(&self) -> Option<GatewayError> {
        self.shared.failure()
    }

    pub fn presence(&self) -> PresencePayload {
        self.shared.presence()
    }

    pub fn heartbeat_running(&self) -> bool {
        self.shared.heartbeat_running()
    }

    /// Interval announced by the last Hello
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.shared.heartbeat_interval()
    }

    /// Check if a transport is currently open
    pub fn has_transport(&self) -> bool {
        self.shared.writer().is_some_and(|w| w.is_open())
    }
}

impl std::fmt::Debug for GatewayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayHandle")
            .field("state", &self.state())
            .field("session", &self.shared.session)
            .finish()
    }
}
