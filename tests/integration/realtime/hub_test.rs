//! Connection hub integration tests
//!
//! Drive full-duplex connections through a running hub backed by the
//! in-process pub/sub backend.

use std::sync::Arc;
use std::time::Duration;

use basecast::backend::pubsub::{PubSubBackend, MemoryPubSub};
use basecast::shared::{Command, CommandType, SYSTEM_CHANNEL};
use pretty_assertions::assert_eq;

use crate::common::*;

fn memory() -> Arc<dyn PubSubBackend> {
    Arc::new(MemoryPubSub::new(Duration::from_millis(500)))
}

#[tokio::test]
async fn test_init_carries_connection_id() {
    let hub = spawn_hub(memory());
    let a = connect(&hub).await;
    let b = connect(&hub).await;
    assert_ne!(a.id(), b.id());
}

#[tokio::test]
async fn test_echo_reaches_only_sender() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;
    let mut b = connect(&hub).await;

    a.send(Command::new("", CommandType::Echo, "hi")).await.unwrap();

    let reply = crate::assert_command!(next(&mut a).await, CommandType::Echo);
    assert_eq!(reply.data, "echo: hi");
    assert_quiet(&mut b, Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_join_then_publish() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;
    let mut b = connect(&hub).await;

    a.send(Command::new("", CommandType::Join, "room")).await.unwrap();
    let joined = crate::assert_command!(next(&mut a).await, CommandType::Joined);
    assert_eq!(joined.channel, "room");
    tokio::time::sleep(SETTLE).await;

    b.send(
        Command::new("", CommandType::ChanIn, "hello")
            .with_channel("room")
            .with_token("b-secret"),
    )
    .await
    .unwrap();

    let ok = crate::assert_command!(next(&mut b).await, CommandType::Ok);
    assert_eq!(ok.channel, "room");

    let delivered = crate::assert_command!(next(&mut a).await, CommandType::ChanOut);
    assert_eq!(delivered.data, "hello");
    assert_eq!(delivered.channel, "room");
    assert_eq!(delivered.sender_id, b.id());
    assert!(delivered.token.is_empty());
}

#[tokio::test]
async fn test_join_reads_channel_field_when_data_is_empty() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;

    a.send(Command::new("", CommandType::Join, "").with_channel("lobby")).await.unwrap();
    let joined = crate::assert_command!(next(&mut a).await, CommandType::Joined);
    assert_eq!(joined.channel, "lobby");
}

#[tokio::test]
async fn test_sender_id_cannot_be_spoofed() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;
    let mut b = connect(&hub).await;

    a.send(Command::new("", CommandType::Join, "room")).await.unwrap();
    next_of_kind(&mut a, CommandType::Joined).await;
    tokio::time::sleep(SETTLE).await;

    b.send(Command::new(a.id(), CommandType::ChanIn, "forged").with_channel("room"))
        .await
        .unwrap();

    let delivered = next_of_kind(&mut a, CommandType::ChanOut).await;
    assert_eq!(delivered.sender_id, b.id());
}

#[tokio::test]
async fn test_reserved_channel_is_never_published() {
    let backend = CountingBackend::new();
    let hub = spawn_hub(backend.clone());
    let mut a = connect(&hub).await;

    a.send(Command::new("", CommandType::ChanIn, "{}").with_channel("db-tasks"))
        .await
        .unwrap();
    let error = crate::assert_command!(next(&mut a).await, CommandType::Error);
    assert_eq!(error.data, "you cannot write to a reserved channel");

    a.send(Command::new("", CommandType::ChanIn, "{}").with_channel(SYSTEM_CHANNEL))
        .await
        .unwrap();
    crate::assert_command!(next(&mut a).await, CommandType::Error);

    assert_eq!(backend.publish_count(), 0);
}

#[tokio::test]
async fn test_system_channel_cannot_be_joined() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;

    a.send(Command::new("", CommandType::Join, SYSTEM_CHANNEL)).await.unwrap();
    let error = crate::assert_command!(next(&mut a).await, CommandType::Error);
    assert_eq!(error.data, "this channel is reserved");
}

#[tokio::test]
async fn test_missing_channel_is_an_error() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;

    a.send(Command::new("", CommandType::ChanIn, "hello")).await.unwrap();
    crate::assert_command!(next(&mut a).await, CommandType::Error);

    a.send(Command::new("", CommandType::Join, "")).await.unwrap();
    crate::assert_command!(next(&mut a).await, CommandType::Error);
}

#[tokio::test]
async fn test_unknown_command_type() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;

    let cmd = Command::from_client(r#"{"type": "teleport", "data": "x"}"#).unwrap();
    a.send(cmd).await.unwrap();
    let error = crate::assert_command!(next(&mut a).await, CommandType::Error);
    crate::assert_contains!(error.data, "unknown command type");

    // Presence is broker-only.
    a.send(Command::new("", CommandType::Presence, "room")).await.unwrap();
    crate::assert_command!(next(&mut a).await, CommandType::Error);
}

#[tokio::test]
async fn test_auth_replies_token_or_error() {
    let hub = spawn_hub(memory());
    let mut a = connect(&hub).await;

    a.send(Command::new("", CommandType::Auth, "not-a-token")).await.unwrap();
    crate::assert_command!(next(&mut a).await, CommandType::Error);

    let token = issue_token(&basecast::shared::Auth::new("acct", "user", "u@example.com"));
    a.send(Command::new("", CommandType::Auth, token.clone())).await.unwrap();
    let reply = crate::assert_command!(next(&mut a).await, CommandType::Token);
    assert_eq!(reply.data, token);
}

#[tokio::test]
async fn test_disconnect_cancels_subscriptions() {
    let backend = memory();
    let hub = spawn_hub(backend.clone());
    let mut a = connect(&hub).await;

    a.send(Command::new("", CommandType::Join, "room")).await.unwrap();
    next_of_kind(&mut a, CommandType::Joined).await;
    a.send(Command::new("", CommandType::Join, "other")).await.unwrap();
    next_of_kind(&mut a, CommandType::Joined).await;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(backend.subscriber_count("room").await.unwrap(), 1);

    a.close().await.unwrap();
    let closed = tokio::time::timeout(RECV_DEADLINE, a.recv()).await.unwrap();
    assert!(closed.is_none());

    let mut remaining = usize::MAX;
    for _ in 0..20 {
        remaining = backend.subscriber_count("room").await.unwrap()
            + backend.subscriber_count("other").await.unwrap();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(SETTLE).await;
    }
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_commands_after_disconnect_are_ignored() {
    let hub = spawn_hub(memory());
    let a = connect(&hub).await;
    let id = a.id().to_string();
    let (_, mut outbound) = a.into_parts();

    hub.disconnect(&id).await.unwrap();
    hub.submit(&id, Command::new("", CommandType::Echo, "late")).await.unwrap();

    let next = tokio::time::timeout(RECV_DEADLINE, outbound.recv()).await.unwrap();
    assert!(next.is_none());
}

#[tokio::test]
async fn test_slow_consumer_is_dropped() {
    let hub = basecast::backend::realtime::Hub::spawn(router_context(memory()), 2);
    let mut slow = connect(&hub).await;

    for _ in 0..5 {
        slow.send(Command::new("", CommandType::Echo, "x")).await.unwrap();
    }

    let mut received = 0;
    while let Ok(Some(_)) = tokio::time::timeout(RECV_DEADLINE, slow.recv()).await {
        received += 1;
    }
    // The queue holds two; the third echo overflows it and closes the connection.
    assert_eq!(received, 2);
}
