//! Heartbeat task
//!
//! Sends `{"op":1,"d":last_sequence}` once per interval until cancelled.

use super::{SessionState, WriterHandle};
use crate::protocol::GatewayMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Handle to a running heartbeat loop bound to one transport
pub struct HeartbeatTask {
    interval: Duration,
    acked: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl HeartbeatTask {
    /// Start beating; the first beat is sent one interval from now
    pub fn spawn(interval: Duration, writer: WriterHandle, session: Arc<SessionState>) -> Self {
        let acked = Arc::new(AtomicBool::new(true));
        let cancelled = Arc::new(AtomicBool::new(false));

        let handle = tokio::spawn(run_heartbeat(
            interval,
            writer,
            session,
            acked.clone(),
            cancelled.clone(),
        ));

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Heartbeat started");

        Self {
            interval,
            acked,
            cancelled,
            handle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record a Heartbeat ACK (op 11)
    pub fn ack(&self) {
        self.acked.store(true, Ordering::SeqCst);
    }

    /// Stop the loop; no beat is sent after this returns
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!("Heartbeat cancelled");
        }
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

impl std::fmt::Debug for HeartbeatTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatTask")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run_heartbeat(
    interval: Duration,
    writer: WriterHandle,
    session: Arc<SessionState>,
    acked: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        if !writer.is_open() {
            tracing::debug!("Transport closed, heartbeat stopping");
            break;
        }

        if !acked.swap(false, Ordering::SeqCst) {
            tracing::warn!("Previous heartbeat was not acknowledged");
        }

        let seq = session.last_sequence();
        if let Err(e) = writer.send(&GatewayMessage::heartbeat(seq)).await {
            tracing::debug!(error = %e, "Heartbeat send failed, stopping");
            break;
        }
        tracing::trace!(seq, "Heartbeat sent");
    }
}
