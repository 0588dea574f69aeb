//! Chord bot entry point
//!
//! Run with:
//! ```bash
//! CHORD_TOKEN=... cargo run -p chord-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use chord_common::{try_init_tracing, try_init_tracing_with_config, BotConfig, ClientResult, TracingConfig};
use chord_gateway::{Bot, BotHandle, Event, GatewayEventType};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            let _ = try_init_tracing();
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, code = e.error_code(), "Bot stopped with an error");
        std::process::exit(1);
    }
}

async fn run(config: BotConfig) -> ClientResult<()> {
    info!(env = ?config.env, shard = ?config.shard(), "Starting chord bot...");

    let mut bot = Bot::new(config)?;

    bot.on(GatewayEventType::Ready, |bot: BotHandle, event: Event| async move {
        if let Event::Ready(ready) = event {
            info!(
                user = %ready.user.username,
                guilds = ready.guilds.len(),
                session_id = ?bot.session_id(),
                "Bot is ready"
            );
        }
        anyhow::Ok(())
    });

    bot.on(GatewayEventType::MessageCreate, |_bot: BotHandle, event: Event| async move {
        if let Event::MessageCreate(message) = event {
            info!(
                channel_id = %message.channel_id,
                author = ?message.author.as_ref().map(|a| a.username.as_str()),
                content = %message.content,
                "Message received"
            );
        }
        anyhow::Ok(())
    });

    let handle = bot.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            handle.stop();
        }
    });

    bot.run().await
}
