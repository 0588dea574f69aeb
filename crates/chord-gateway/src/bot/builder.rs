use super::{Bot, BotHandle};
use crate::connection::{ConnectionConfig, GatewayConnection};
use crate::events::EventDispatcher;
use crate::protocol::{GatewayMessage, IdentifyProperties, PresencePayload};
use crate::transport::{Connector, WsConnector};
use chord_cache::{Cache, SharedCache};
use chord_common::{BotConfig, ClientResult};
use chord_rest::RestClient;
use std::sync::Arc;

/// Builder for [`Bot`]
pub struct BotBuilder {
    config: BotConfig,
    connector: Option<Arc<dyn Connector>>,
    rest: Option<RestClient>,
    cache: Option<SharedCache>,
    identify_override: Option<GatewayMessage>,
    properties: Option<IdentifyProperties>,
    presence: Option<PresencePayload>,
}

impl BotBuilder {
    pub(crate) fn new(config: BotConfig) -> Self {
        Self {
            config,
            connector: None,
            rest: None,
            cache: None,
            identify_override: None,
            properties: None,
            presence: None,
        }
    }

    /// Transport connector; defaults to [`WsConnector`]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// REST client; defaults to one built from the config
    pub fn rest(mut self, rest: RestClient) -> Self {
        self.rest = Some(rest);
        self
    }

    /// Share an existing cache
    pub fn cache(mut self, cache: SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Send this message instead of the default Identify
    pub fn identify_override(mut self, message: GatewayMessage) -> Self {
        self.identify_override = Some(message);
        self
    }

    pub fn properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Presence to identify with
    pub fn presence(mut self, presence: PresencePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn build(self) -> ClientResult<Bot> {
        self.config.validate()?;

        let rest = match self.rest {
            Some(rest) => rest,
            None => RestClient::from_config(&self.config)?,
        };
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::new()));
        let cache = self.cache.unwrap_or_else(Cache::new_shared);

        let mut connection_config = ConnectionConfig::from_bot_config(&self.config);
        if let Some(properties) = self.properties {
            connection_config.properties = properties;
        }

        let connection = GatewayConnection::new(connection_config, connector);
        if let Some(presence) = self.presence {
            connection.set_presence(presence);
        }

        let dispatcher = EventDispatcher::new(cache.clone(), self.config.handler_concurrency);
        let handle = BotHandle::new(connection.handle(), cache, rest);

        Ok(Bot::from_parts(
            self.config,
            connection,
            dispatcher,
            handle,
            self.identify_override,
        ))
    }
}
