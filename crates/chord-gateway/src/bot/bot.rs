use super::{BotBuilder, BotHandle};
use crate::connection::GatewayConnection;
use crate::events::{EventDispatcher, EventHandler, GatewayEventType};
use crate::protocol::{GatewayMessage, OpCode};
use chord_cache::SharedCache;
use chord_common::{BotConfig, ClientError, ClientResult};
use serde_json::Value;
use std::sync::Arc;

/// A gateway bot
///
/// ```ignore
/// let mut bot = Bot::new(BotConfig::from_env()?)?;
/// bot.on(GatewayEventType::MessageCreate, |bot: BotHandle, event: Event| async move {
///     tracing::info!(event = %event.kind(), "got a message");
///     anyhow::Ok(())
/// });
/// bot.run().await?;
/// ```
pub struct Bot {
    config: BotConfig,
    connection: GatewayConnection,
    dispatcher: EventDispatcher,
    handle: BotHandle,
    identify_override: Option<GatewayMessage>,
}

impl Bot {
    pub fn builder(config: BotConfig) -> BotBuilder {
        BotBuilder::new(config)
    }

    /// Create a bot with the default transport and REST client
    pub fn new(config: BotConfig) -> ClientResult<Self> {
        Self::builder(config).build()
    }

    pub(crate) fn from_parts(
        config: BotConfig,
        connection: GatewayConnection,
        dispatcher: EventDispatcher,
        handle: BotHandle,
        identify_override: Option<GatewayMessage>,
    ) -> Self {
        Self {
            config,
            connection,
            dispatcher,
            handle,
            identify_override,
        }
    }

    /// Register the handler for an event type
    pub fn on<H>(&mut self, kind: GatewayEventType, handler: H) -> &mut Self
    where
        H: EventHandler,
    {
        self.dispatcher.register(kind, Arc::new(handler));
        self
    }

    /// Register a handler by public event name, e.g. `"message_create"`
    pub fn on_named<H>(&mut self, name: &str, handler: H) -> ClientResult<&mut Self>
    where
        H: EventHandler,
    {
        let kind = GatewayEventType::from_handler_name(name)
            .ok_or_else(|| ClientError::invalid_input(format!("unknown event name: {name}")))?;
        Ok(self.on(kind, handler))
    }

    /// Handle usable from other tasks
    pub fn handle(&self) -> BotHandle {
        self.handle.clone()
    }

    pub fn cache(&self) -> &SharedCache {
        self.handle.cache()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Connect and process events until stopped or failed
    ///
    /// Returns `Ok(())` after [`BotHandle::stop`] or when the gateway closes a
    /// connection that has no session to resume. Authentication failures and
    /// exhausted resume attempts come back as errors.
    pub async fn run(&mut self) -> ClientResult<()> {
        let base = match &self.config.gateway.url {
            Some(url) => url.clone(),
            None => self.handle.rest().gateway_url().await?,
        };
        let url = self.config.gateway.connect_url(&base);

        self.connection
            .connect(&url, self.identify_override.clone())
            .await?;

        loop {
            match self.connection.next_payload().await {
                Ok(Some(message)) => self.on_payload(message),
                Ok(None) => {
                    tracing::info!("Gateway run finished");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, code = e.error_code(), "Gateway run failed");
                    return Err(e.into());
                }
            }
        }
    }

    fn on_payload(&self, mut message: GatewayMessage) {
        if message.op != OpCode::Dispatch {
            return;
        }
        let Some(tag) = message.t.take() else {
            tracing::debug!("Dispatch without an event type");
            return;
        };

        let data = message.d.take().unwrap_or(Value::Null);
        self.dispatcher.dispatch(&tag, data, &self.handle);
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("connection", &self.connection)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
