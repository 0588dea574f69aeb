use crate::connection::{ConnectionState, GatewayHandle};
use crate::error::{GatewayError, TransportError};
use crate::protocol::{PresencePayload, Status};
use chord_cache::SharedCache;
use chord_common::ClientResult;
use chord_core::{Activity, ActivityType};
use chord_rest::{Method, RestClient};
use serde_json::Value;

/// Thread-safe handle to a running bot
///
/// Handed to every event handler. Presence changes are queued to the task
/// that owns the transport, so they never interleave with a heartbeat.
#[derive(Clone)]
pub struct BotHandle {
    gateway: GatewayHandle,
    cache: SharedCache,
    rest: RestClient,
}

impl BotHandle {
    pub(crate) fn new(gateway: GatewayHandle, cache: SharedCache, rest: RestClient) -> Self {
        Self { gateway, cache, rest }
    }

    /// Show a single activity, e.g. "Playing chess"
    pub async fn set_presence(
        &self,
        name: impl Into<String>,
        kind: ActivityType,
        url: Option<String>,
    ) -> Result<(), TransportError> {
        let mut activity = Activity::new(name, kind);
        if let Some(url) = url {
            activity = activity.with_url(url);
        }

        self.gateway
            .update_presence(move |presence| presence.activities = vec![activity])
            .await
    }

    pub async fn set_status(&self, status: Status) -> Result<(), TransportError> {
        self.gateway
            .update_presence(move |presence| {
                *presence = std::mem::take(presence).with_status(status);
            })
            .await
    }

    pub fn presence(&self) -> PresencePayload {
        self.gateway.presence()
    }

    /// Call the REST API directly
    pub async fn api(&self, method: Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        self.rest.call(method, path, body).await
    }

    /// Stop the bot; `run` returns shortly after
    pub fn stop(&self) {
        self.gateway.stop();
    }

    pub fn state(&self) -> ConnectionState {
        self.gateway.state()
    }

    pub fn is_connected(&self) -> bool {
        self.gateway.is_connected()
    }

    pub fn session_id(&self) -> Option<String> {
        self.gateway.session_id()
    }

    pub fn last_sequence(&self) -> u64 {
        self.gateway.last_sequence()
    }

    pub fn last_error(&self) -> Option<GatewayError> {
        self.gateway.last_error()
    }

    pub fn gateway(&self) -> &GatewayHandle {
        &self.gateway
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }
}

impl std::fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotHandle")
            .field("gateway", &self.gateway)
            .field("rest", &self.rest.base_url())
            .finish()
    }
}
