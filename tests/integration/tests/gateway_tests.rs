//! Gateway session tests against a scripted in-memory gateway
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use chord_gateway::{
    ConnectionConfig, ConnectionState, GatewayConnection, GatewayError, GatewayMessage, OpCode,
    PresencePayload, Status,
};
use integration_tests::*;
use serde_json::json;
use std::time::Duration;

async fn connected(
    connector: &std::sync::Arc<MockConnector>,
    transports: &mut Transports,
) -> (GatewayConnection, ServerEnd) {
    let mut connection = connection(connector.clone());
    connection
        .connect(&connect_url(), None)
        .await
        .expect("connect failed");
    let server = transports.next().await;
    (connection, server)
}

// ============================================================================
// Handshake & Heartbeat
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_hello_sends_identify_then_heartbeats_on_interval() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    assert_eq!(server.url(), connect_url());
    assert_eq!(connection.state(), ConnectionState::AwaitingHello);

    server.send_text(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);
    let driven = drive(connection);
    settle().await;

    let identify = server.sent_with_op(2);
    assert_eq!(identify.len(), 1);
    assert_eq!(identify[0]["d"]["token"], TEST_TOKEN);
    assert_eq!(identify[0]["d"]["large_threshold"], 250);
    assert!(identify[0]["d"].get("shard").is_none());
    assert_eq!(driven.handle.state(), ConnectionState::Identifying);
    assert_eq!(driven.handle.heartbeat_interval(), Some(Duration::from_millis(41_250)));

    tokio::time::advance(Duration::from_millis(41_249)).await;
    settle().await;
    assert!(server.sent_with_op(1).is_empty());

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(server.sent_with_op(1), vec![json!({ "op": 1, "d": 0 })]);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_hello_is_ignored() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(1_000);
    server.hello(1_000);
    let _driven = drive(connection);
    settle().await;
    assert_eq!(server.sent_with_op(2).len(), 1);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    settle().await;
    assert_eq!(server.sent_with_op(1).len(), 1);

    tokio::time::advance(Duration::from_millis(1_000)).await;
    settle().await;
    assert_eq!(server.sent_with_op(1).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_request_answered_immediately() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 4, ready_payload("abc", None));
    server.send_text(r#"{"op":1,"d":null}"#);
    let _driven = drive(connection);

    assert!(wait_until(|| !server.sent_with_op(1).is_empty()).await);
    assert_eq!(server.sent_with_op(1)[0], json!({ "op": 1, "d": 4 }));
}

#[tokio::test(start_paused = true)]
async fn test_identify_carries_shard_when_sharding() {
    let (connector, mut transports) = MockConnector::new();
    let mut config = test_config();
    config.shard_id = 1;
    config.shard_count = 2;

    let mut connection =
        GatewayConnection::new(ConnectionConfig::from_bot_config(&config), connector.clone());
    connection.connect(&connect_url(), None).await.expect("connect failed");
    let server = transports.next().await;

    server.hello(41_250);
    let _driven = drive(connection);
    settle().await;

    let identify = server.sent_with_op(2);
    assert_eq!(identify[0]["d"]["shard"], json!([1, 2]));
}

#[tokio::test(start_paused = true)]
async fn test_identify_override_is_sent_verbatim() {
    let (connector, mut transports) = MockConnector::new();
    let custom = GatewayMessage::from_json(r#"{"op":2,"d":{"token":"override-token","intents":0}}"#)
        .expect("valid identify");

    let mut connection = connection(connector.clone());
    connection
        .connect(&connect_url(), Some(custom))
        .await
        .expect("connect failed");
    let server = transports.next().await;

    server.hello(41_250);
    let _driven = drive(connection);
    settle().await;

    let identify = server.sent_with_op(2);
    assert_eq!(identify.len(), 1);
    assert_eq!(identify[0]["d"]["token"], "override-token");
}

// ============================================================================
// Sequence Tracking
// ============================================================================

async fn next_message(connection: &mut GatewayConnection) -> GatewayMessage {
    connection
        .next_payload()
        .await
        .expect("connection failed")
        .expect("connection ended")
}

#[tokio::test(start_paused = true)]
async fn test_sequence_only_moves_forward() {
    let (connector, mut transports) = MockConnector::new();
    let (mut connection, server) = connected(&connector, &mut transports).await;
    let handle = connection.handle();

    server.hello(41_250);
    server.dispatch("READY", 5, ready_payload("abc", None));
    server.send_text(r#"{"op":11,"d":null}"#);
    server.send_text(r#"{"op":0,"t":"TYPING_START","s":null,"d":{"channel_id":"1","user_id":"2","timestamp":0}}"#);
    server.dispatch("TYPING_START", 3, json!({ "channel_id": "1", "user_id": "2", "timestamp": 0 }));
    server.dispatch("MESSAGE_CREATE", 6, message_payload(1, 1, "hi"));

    assert_eq!(next_message(&mut connection).await.op, OpCode::Hello);
    assert_eq!(handle.last_sequence(), 0);

    assert!(next_message(&mut connection).await.is_dispatch_of("READY"));
    assert_eq!(handle.last_sequence(), 5);

    assert_eq!(next_message(&mut connection).await.op, OpCode::HeartbeatAck);
    assert_eq!(handle.last_sequence(), 5);

    let unsequenced = next_message(&mut connection).await;
    assert!(unsequenced.is_dispatch_of("TYPING_START"));
    assert!(unsequenced.s.is_none());
    assert_eq!(handle.last_sequence(), 5);

    assert_eq!(next_message(&mut connection).await.s, Some(3));
    assert_eq!(handle.last_sequence(), 5);

    assert!(next_message(&mut connection).await.is_dispatch_of("MESSAGE_CREATE"));
    assert_eq!(handle.last_sequence(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_close_forgets_session() {
    let (connector, mut transports) = MockConnector::new();
    let (mut connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", Some(RESUME_URL)));
    server.close(4010);

    let error = loop {
        match connection.next_payload().await {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("run ended without an error"),
            Err(e) => break e,
        }
    };
    assert!(matches!(error, GatewayError::Connectivity(_)));
    assert!(connection.session().session_id().is_none());
    assert!(!connection.session().is_resumable());

    connection.connect(&connect_url(), None).await.expect("reconnect failed");
    let fresh = transports.next().await;
    assert_eq!(fresh.url(), connect_url());

    fresh.hello(41_250);
    assert_eq!(next_message(&mut connection).await.op, OpCode::Hello);
    assert!(wait_until(|| !fresh.sent_with_op(2).is_empty()).await);
    assert!(fresh.sent_with_op(6).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_ready_establishes_session() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", Some(RESUME_URL)));

    let mut driven = drive(connection);
    driven.next_dispatch("READY").await.expect("ready");
    assert_eq!(driven.handle.state(), ConnectionState::Connected);
    assert_eq!(driven.handle.session_id().as_deref(), Some("abc"));
    assert!(driven.handle.heartbeat_running());
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_frames_are_skipped() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.send_text("not json");
    server.send_text(r#"{"op":42,"d":null}"#);
    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));

    let mut driven = drive(connection);
    assert!(driven.next_dispatch("READY").await.is_some());
}

// ============================================================================
// Close Handling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_authentication_failure_is_terminal() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));
    server.close(4004);

    let mut driven = drive(connection);
    let error = driven.finish().await.expect("expected an error");

    assert!(matches!(error, GatewayError::Authentication(_)));
    assert_eq!(connector.open_attempts(), 1);
    assert_eq!(driven.handle.state(), ConnectionState::Failed);
    assert_eq!(driven.handle.last_error(), Some(error));
    assert!(!driven.handle.heartbeat_running());
}

#[tokio::test(start_paused = true)]
async fn test_unrecoverable_close_names_the_code() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));
    server.close(4010);

    let mut driven = drive(connection);
    match driven.finish().await {
        Some(GatewayError::Connectivity(message)) => assert!(message.contains("4010")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(connector.open_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_recoverable_close_without_session_ends_quietly() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.close(1000);

    let mut driven = drive(connection);
    assert!(driven.finish().await.is_none());
    assert_eq!(driven.handle.state(), ConnectionState::Disconnected);
    assert_eq!(connector.open_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_is_terminal() {
    let (connector, _transports) = MockConnector::new();
    connector.refuse(1);

    let mut connection = connection(connector.clone());
    let error = connection
        .connect(&connect_url(), None)
        .await
        .expect_err("connect should fail");

    assert!(matches!(error, GatewayError::Transport(_)));
    assert_eq!(connection.state(), ConnectionState::Failed);
    assert_eq!(connection.next_payload().await, Err(error));
}

// ============================================================================
// Resume
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_recoverable_close_resumes_at_announced_url() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", Some(RESUME_URL)));
    server.dispatch("GUILD_CREATE", 2, guild_payload(42, "Test"));

    let mut driven = drive(connection);
    driven.next_dispatch("GUILD_CREATE").await.expect("guild create");

    server.close(1001);
    let resumed = transports.next().await;
    assert_eq!(resumed.url(), test_config().gateway.connect_url(RESUME_URL));
    assert!(wait_until(|| server.is_closed()).await);

    resumed.hello(41_250);
    assert!(wait_until(|| !resumed.sent_with_op(6).is_empty()).await);

    let resume = &resumed.sent_with_op(6)[0];
    assert_eq!(resume["d"]["token"], TEST_TOKEN);
    assert_eq!(resume["d"]["session_id"], "abc");
    assert_eq!(resume["d"]["seq"], 2);
    assert!(resumed.sent_with_op(2).is_empty());

    resumed.dispatch("RESUMED", 3, json!({}));
    driven.next_dispatch("RESUMED").await.expect("resumed");
    assert_eq!(driven.handle.state(), ConnectionState::Connected);
    assert_eq!(driven.handle.last_sequence(), 3);
    assert_eq!(driven.handle.session_id().as_deref(), Some("abc"));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_request_resumes() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));

    let mut driven = drive(connection);
    driven.next_dispatch("READY").await.expect("ready");

    server.send(&GatewayMessage::reconnect());
    let resumed = transports.next().await;
    assert_eq!(resumed.url(), connect_url());

    resumed.hello(41_250);
    assert!(wait_until(|| !resumed.sent_with_op(6).is_empty()).await);
    assert_eq!(resumed.sent_with_op(6)[0]["d"]["seq"], 1);

    resumed.dispatch("RESUMED", 2, json!({}));
    driven.next_dispatch("RESUMED").await.expect("resumed");
    assert!(driven.handle.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_resume_gives_up_after_max_attempts() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));
    connector.refuse(5);
    server.close(1006);

    let mut driven = drive(connection);
    match driven.finish().await {
        Some(GatewayError::Connectivity(message)) => assert!(message.contains('5')),
        other => panic!("unexpected result: {other:?}"),
    }

    assert_eq!(connector.open_attempts(), 6);
    assert!(connector.urls().iter().all(|url| *url == connect_url()));
    assert_eq!(driven.handle.state(), ConnectionState::Failed);
    assert!(!driven.handle.heartbeat_running());
    assert!(!driven.handle.has_transport());
}

#[tokio::test(start_paused = true)]
async fn test_resume_succeeds_after_refused_attempts() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));
    connector.refuse(2);
    connector.script(Script::Frames(vec![
        ScriptedFrame::message(&GatewayMessage::hello(41_250)),
        ScriptedFrame::message(&GatewayMessage::dispatch("RESUMED", 2, json!({}))),
    ]));
    server.close(1006);

    let mut driven = drive(connection);
    driven.next_dispatch("RESUMED").await.expect("resumed");

    assert_eq!(connector.open_attempts(), 4);
    assert!(driven.handle.is_connected());
    let resumed = connector.opened()[1].clone();
    assert!(wait_until(|| resumed.sent_with_op(6).len() == 1).await);
}

// ============================================================================
// Invalid Session
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_invalid_session_starts_fresh_identify() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 3, ready_payload("abc", None));
    server.send(&GatewayMessage::invalid_session(false));

    let driven = drive(connection);
    let handle = driven.handle.clone();

    assert!(wait_until(|| server.sent_with_op(2).len() == 2).await);
    assert_eq!(handle.last_sequence(), 0);
    assert!(handle.session_id().is_none());
    assert_eq!(handle.state(), ConnectionState::Identifying);
}

#[tokio::test(start_paused = true)]
async fn test_resumable_invalid_session_resends_resume() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 3, ready_payload("abc", None));
    server.send(&GatewayMessage::invalid_session(true));

    let driven = drive(connection);

    assert!(wait_until(|| !server.sent_with_op(6).is_empty()).await);
    let resume = &server.sent_with_op(6)[0];
    assert_eq!(resume["d"]["session_id"], "abc");
    assert_eq!(resume["d"]["seq"], 3);
    assert_eq!(server.sent_with_op(2).len(), 1);
    assert_eq!(driven.handle.state(), ConnectionState::Resuming);
}

// ============================================================================
// Presence & Stop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_presence_embedded_in_identify_and_updated_when_connected() {
    let (connector, mut transports) = MockConnector::new();
    let mut connection = connection(connector.clone());
    connection.set_presence(PresencePayload::default().with_status(Status::Idle));
    connection.connect(&connect_url(), None).await.expect("connect failed");
    let server = transports.next().await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));

    let mut driven = drive(connection);
    driven.next_dispatch("READY").await.expect("ready");
    assert_eq!(server.sent_with_op(2)[0]["d"]["presence"]["status"], "idle");

    driven
        .handle
        .update_presence(|presence| presence.status = Status::Dnd)
        .await
        .expect("presence update");

    assert!(wait_until(|| !server.sent_with_op(3).is_empty()).await);
    assert_eq!(server.sent_with_op(3)[0]["d"]["status"], "dnd");
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_releases_transport() {
    let (connector, mut transports) = MockConnector::new();
    let (connection, server) = connected(&connector, &mut transports).await;

    server.hello(41_250);
    server.dispatch("READY", 1, ready_payload("abc", None));

    let mut driven = drive(connection);
    driven.next_dispatch("READY").await.expect("ready");

    driven.handle.stop();
    driven.handle.stop();

    assert!(driven.finish().await.is_none());
    assert!(wait_until(|| server.is_closed()).await);
    assert!(wait_until(|| driven.is_finished()).await);
    assert_eq!(driven.handle.state(), ConnectionState::Disconnected);
    assert!(driven.handle.session_id().is_none());
    assert!(!driven.handle.has_transport());
    assert!(!driven.handle.heartbeat_running());
    assert_eq!(connector.open_attempts(), 1);
}
