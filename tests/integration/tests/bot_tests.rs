//! Bot orchestration tests: dispatch into the cache and user handlers
//!
//! Run with: cargo test -p integration-tests --test bot_tests

use chord_cache::Cache;
use chord_core::Snowflake;
use chord_gateway::{Bot, BotHandle, ConnectionState, Event, GatewayEventType};
use integration_tests::*;
use parking_lot::Mutex;
use std::sync::Arc;

fn bot(connector: Arc<MockConnector>) -> Bot {
    Bot::builder(test_config())
        .connector(connector)
        .build()
        .expect("Failed to build bot")
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ready_and_guild_create_populate_cache() {
    let (connector, mut transports) = MockConnector::new();
    let mut bot = bot(connector.clone());
    let handle = bot.handle();

    let script = async {
        let server = transports.next().await;
        assert_eq!(server.url(), connect_url());

        server.hello(41_250);
        server.dispatch("READY", 1, ready_payload("abc", None));
        server.send_text(
            r#"{"op":0,"s":3,"t":"GUILD_CREATE","d":{"id":"42","name":"Test","channels":[],"roles":[],"members":[]}}"#,
        );

        let cached = || handle.cache().guild(Snowflake::new(42));
        assert!(wait_until(|| cached().is_some_and(|g| !g.unavailable && g.name == "Test")).await);
        assert_eq!(handle.last_sequence(), 3);
        assert_eq!(handle.session_id().as_deref(), Some("abc"));
        assert_eq!(handle.state(), ConnectionState::Connected);
        assert_eq!(handle.cache().current_user().map(|u| u.username), Some("chord-bot".to_string()));
        handle.stop();
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    result.expect("run should end cleanly");

    let guild = handle.cache().guild(Snowflake::new(42)).expect("guild cached");
    assert_eq!(guild.name, "Test");
    assert_eq!(handle.state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_injected_cache_receives_updates() {
    let (connector, mut transports) = MockConnector::new();
    let cache = Cache::new_shared();
    let mut bot = Bot::builder(test_config())
        .connector(connector.clone())
        .cache(cache.clone())
        .build()
        .expect("Failed to build bot");
    let handle = bot.handle();

    let script = async {
        let server = transports.next().await;
        server.hello(41_250);
        server.dispatch("READY", 1, ready_payload("abc", None));
        server.dispatch("GUILD_CREATE", 2, guild_payload(42, "Test"));

        assert!(wait_until(|| cache.guild(Snowflake::new(42)).is_some_and(|g| g.name == "Test")).await);
        handle.stop();
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    assert!(result.is_ok());
    assert!(Arc::ptr_eq(&cache, bot.cache()));
    assert_eq!(cache.channel(Snowflake::new(420)).map(|c| c.id), Some(Snowflake::new(420)));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_event_does_not_stop_processing() {
    let (connector, mut transports) = MockConnector::new();
    let mut bot = bot(connector.clone());
    let handle = bot.handle();

    let script = async {
        let server = transports.next().await;
        server.hello(41_250);
        server.dispatch("READY", 1, ready_payload("abc", None));
        server.dispatch("SOMETHING_NEW", 2, serde_json::json!({ "x": 1 }));
        server.dispatch("GUILD_CREATE", 3, guild_payload(7, "Seven"));

        assert!(wait_until(|| handle.cache().contains_guild(Snowflake::new(7))).await);
        assert_eq!(handle.last_sequence(), 3);
        handle.stop();
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_channel_updates_keep_one_entry() {
    let (connector, mut transports) = MockConnector::new();
    let mut bot = bot(connector.clone());
    let handle = bot.handle();

    let script = async {
        let server = transports.next().await;
        server.hello(41_250);
        server.dispatch("READY", 1, ready_payload("abc", None));
        server.dispatch("GUILD_CREATE", 2, guild_payload(1, "One"));
        server.dispatch("CHANNEL_UPDATE", 3, channel_payload(20, 1, "old"));
        server.dispatch("CHANNEL_UPDATE", 4, channel_payload(20, 1, "new"));

        assert!(wait_until(|| handle.last_sequence() == 4).await);
        handle.stop();
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    assert!(result.is_ok());

    let guild = handle.cache().guild(Snowflake::new(1)).expect("guild cached");
    let named: Vec<_> = guild.channels.iter().filter(|c| c.id == Snowflake::new(20)).collect();
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].name.as_deref(), Some("new"));
}

// ============================================================================
// Handlers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_handlers_receive_events_by_name() {
    let (connector, mut transports) = MockConnector::new();
    let mut bot = bot(connector.clone());
    let handle = bot.handle();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorder = seen.clone();
    bot.on_named("guild_create", move |_bot: BotHandle, event: Event| {
        let recorder = recorder.clone();
        async move {
            recorder.lock().push(event.guild_id());
            anyhow::Ok(())
        }
    })
    .expect("known event name");

    assert!(bot
        .on_named("not_an_event", |_bot: BotHandle, _event: Event| async { anyhow::Ok(()) })
        .is_err());

    let script = async {
        let server = transports.next().await;
        server.hello(41_250);
        server.dispatch("READY", 1, ready_payload("abc", None));
        server.dispatch("GUILD_CREATE", 2, guild_payload(42, "Test"));

        assert!(wait_until(|| !seen.lock().is_empty()).await);
        handle.stop();
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    assert!(result.is_ok());
    assert_eq!(seen.lock().as_slice(), &[Some(Snowflake::new(42))]);
}

#[tokio::test(start_paused = true)]
async fn test_failing_handlers_do_not_stop_the_bot() {
    let (connector, mut transports) = MockConnector::new();
    let mut bot = bot(connector.clone());
    let handle = bot.handle();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let recorder = seen.clone();
    bot.on(GatewayEventType::MessageCreate, move |_bot: BotHandle, event: Event| {
        let recorder = recorder.clone();
        async move {
            let Event::MessageCreate(message) = event else {
                anyhow::bail!("unexpected event");
            };
            match message.content.as_str() {
                "fail" => anyhow::bail!("handler failed"),
                "panic" => panic!("handler panicked"),
                other => recorder.lock().push(other.to_string()),
            }
            anyhow::Ok(())
        }
    });

    let script = async {
        let server = transports.next().await;
        server.hello(41_250);
        server.dispatch("READY", 1, ready_payload("abc", None));
        server.dispatch("MESSAGE_CREATE", 2, message_payload(1, 10, "fail"));
        server.dispatch("MESSAGE_CREATE", 3, message_payload(2, 10, "panic"));
        server.dispatch("MESSAGE_CREATE", 4, message_payload(3, 10, "ok"));

        assert!(wait_until(|| !seen.lock().is_empty()).await);
        assert!(handle.is_connected());
        handle.stop();
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    assert!(result.is_ok());
    assert_eq!(seen.lock().as_slice(), &["ok".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_handler_can_update_presence() {
    let (connector, mut transports) = MockConnector::new();
    let mut bot = bot(connector.clone());
    let handle = bot.handle();

    bot.on(GatewayEventType::Ready, |bot: BotHandle, _event: Event| async move {
        bot.set_presence("chess", chord_core::ActivityType::Playing, None).await?;
        anyhow::Ok(())
    });

    let script = async {
        let server = transports.next().await;
        server.hello(41_250);
        server.dispatch("READY", 1, ready_payload("abc", None));

        assert!(wait_until(|| !server.sent_with_op(3).is_empty()).await);
        let update = &server.sent_with_op(3)[0];
        assert_eq!(update["d"]["activities"][0]["name"], "chess");
        handle.stop();
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    assert!(result.is_ok());
    assert_eq!(handle.presence().activities.len(), 1);
}

// ============================================================================
// Failure
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_surfaces_authentication_failure() {
    let (connector, mut transports) = MockConnector::new();
    let mut bot = bot(connector.clone());

    let script = async {
        let server = transports.next().await;
        server.hello(41_250);
        server.close(4004);
    };

    let (result, ()) = tokio::join!(bot.run(), script);
    let error = result.expect_err("run should fail");
    assert_eq!(error.error_code(), "AUTHENTICATION_FAILED");
    assert_eq!(bot.handle().state(), ConnectionState::Failed);
}
