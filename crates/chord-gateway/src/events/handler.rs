//! User event handlers

use super::Event;
use crate::bot::BotHandle;
use async_trait::async_trait;
use std::future::Future;

/// Handler for one event type
///
/// Implemented for any async closure `Fn(BotHandle, Event) -> impl Future<Output = anyhow::Result<()>>`.
/// Errors are logged by the dispatcher and never reach the receive loop.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, bot: BotHandle, event: Event) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(BotHandle, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, bot: BotHandle, event: Event) -> anyhow::Result<()> {
        (self)(bot, event).await
    }
}
