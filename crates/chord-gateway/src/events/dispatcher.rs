//! Event dispatcher
//!
//! Builds typed events on the receive loop, in receive order, and runs the
//! matching user handler on its own task.

use super::{Event, EventHandler, EventRegistry, GatewayEventType};
use crate::bot::BotHandle;
use crate::error::EventError;
use chord_cache::SharedCache;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Routes dispatch payloads to the cache and to user handlers
pub struct EventDispatcher {
    registry: EventRegistry,
    cache: SharedCache,
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
    /// Caps handlers running at once
    permits: Arc<Semaphore>,
}

impl EventDispatcher {
    pub fn new(cache: SharedCache, handler_concurrency: usize) -> Self {
        Self {
            registry: EventRegistry::standard(),
            cache,
            handlers: HashMap::new(),
            permits: Arc::new(Semaphore::new(handler_concurrency.max(1))),
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Register a handler, replacing any previous one for the same event
    pub fn register(&mut self, kind: GatewayEventType, handler: Arc<dyn EventHandler>) {
        if self.handlers.insert(kind, handler).is_some() {
            tracing::debug!(event = %kind, "Replaced event handler");
        }
    }

    pub fn has_handler(&self, kind: GatewayEventType) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Build the event for `tag` without running a handler
    ///
    /// Unknown tags yield `Ok(None)`.
    pub fn build(&self, tag: &str, data: Value) -> Result<Option<Event>, EventError> {
        match self.registry.lookup(tag) {
            Some(entry) => entry.build(&self.cache, data).map(Some),
            None => Ok(None),
        }
    }

    /// Build the event and start its handler
    ///
    /// Returns the handler task, if one was started. Unknown tags and
    /// undecodable payloads are logged and dropped.
    pub fn dispatch(&self, tag: &str, data: Value, bot: &BotHandle) -> Option<JoinHandle<()>> {
        let event = match self.build(tag, data) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::trace!(event = %tag, "Ignoring unknown event");
                return None;
            }
            Err(e) => {
                tracing::warn!(event = %tag, error = %e, "Failed to build event");
                return None;
            }
        };

        let kind = event.kind();
        let handler = self.handlers.get(&kind)?.clone();
        let permits = self.permits.clone();
        let bot = bot.clone();

        let span = tracing::debug_span!("event_handler", event = %kind);
        Some(tokio::spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };

                match AssertUnwindSafe(handler.handle(bot, event)).catch_unwind().await {
                    Ok(Ok(())) => tracing::trace!("Handler finished"),
                    Ok(Err(e)) => tracing::error!(error = ?e, "Event handler failed"),
                    Err(panic) => {
                        tracing::error!(panic = %panic_message(panic.as_ref()), "Event handler panicked");
                    }
                }
            }
            .instrument(span),
        ))
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
