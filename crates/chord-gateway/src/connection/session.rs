//! Session data kept across reconnects

use crate::protocol::ResumePayload;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Session identity and replay position
///
/// Lives only in memory. `last_sequence` never decreases except through an
/// explicit [`reset_sequence`](Self::reset_sequence) when the session is invalidated.
pub struct SessionState {
    token: String,
    shard_id: u32,
    shard_count: u32,
    session_id: RwLock<Option<String>>,
    resume_url: RwLock<Option<String>>,
    last_sequence: AtomicU64,
}

impl SessionState {
    pub fn new(token: impl Into<String>, shard_id: u32, shard_count: u32) -> Self {
        Self {
            token: token.into(),
            shard_id,
            shard_count,
            session_id: RwLock::new(None),
            resume_url: RwLock::new(None),
            last_sequence: AtomicU64::new(0),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    /// Shard pair for Identify, only when sharding
    pub fn shard(&self) -> Option<[u32; 2]> {
        (self.shard_count > 1).then_some([self.shard_id, self.shard_count])
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// URL to reconnect to when resuming, as announced by READY
    pub fn resume_url(&self) -> Option<String> {
        self.resume_url.read().clone()
    }

    /// Record the session established by READY
    pub fn set_session(&self, session_id: impl Into<String>, resume_url: Option<String>) {
        *self.session_id.write() = Some(session_id.into());
        *self.resume_url.write() = resume_url;
    }

    pub fn clear_session_id(&self) {
        *self.session_id.write() = None;
        *self.resume_url.write() = None;
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    /// Record a sequence number seen on an inbound payload
    ///
    /// Returns the stored value, which is never lower than before.
    pub fn observe_sequence(&self, seq: u64) -> u64 {
        let previous = self.last_sequence.fetch_max(seq, Ordering::SeqCst);
        if seq < previous {
            tracing::debug!(seq, last_sequence = previous, "Ignoring out-of-order sequence number");
        }
        previous.max(seq)
    }

    pub fn reset_sequence(&self) {
        self.last_sequence.store(0, Ordering::SeqCst);
    }

    /// A session can be resumed once READY was seen and at least one sequence number
    pub fn is_resumable(&self) -> bool {
        self.session_id.read().is_some() && self.last_sequence() > 0
    }

    /// Build the Resume payload, if there is a session to resume
    pub fn resume_payload(&self) -> Option<ResumePayload> {
        let session_id = self.session_id()?;
        Some(ResumePayload {
            token: self.token.clone(),
            session_id,
            seq: self.last_sequence(),
        })
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("token", &"<redacted>")
            .field("shard_id", &self.shard_id)
            .field("shard_count", &self.shard_count)
            .field("session_id", &self.session_id())
            .field("last_sequence", &self.last_sequence())
            .finish()
    }
}
