//! Event broker integration tests
//!
//! Push-only connections: the test plays the SSE transport by draining
//! the connection's queue, and posts commands through `broadcast`.

use std::sync::Arc;
use std::time::Duration;

use basecast::backend::pubsub::{MemoryPubSub, PubSubBackend};
use basecast::backend::realtime::Broker;
use basecast::shared::{Command, CommandType};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::*;

struct PushClient {
    id: String,
    rx: mpsc::Receiver<Command>,
    task: JoinHandle<()>,
}

async fn open(broker: &Broker) -> PushClient {
    let (tx, mut rx) = mpsc::channel(broker.outbound_capacity());
    let accepting = broker.clone();
    let task = tokio::spawn(async move {
        accepting.accept(tx).await.unwrap();
    });

    let init = next_pushed(&mut rx).await;
    assert_eq!(init.kind, CommandType::Init);
    PushClient { id: init.data, rx, task }
}

async fn counter(backend: &Arc<dyn PubSubBackend>, key: &str) -> String {
    backend.get(key).await.unwrap_or_else(|_| "0".to_string())
}

#[tokio::test]
async fn test_echo_is_pushed_to_sender() {
    let broker = spawn_broker(Arc::new(MemoryPubSub::new(Duration::from_millis(500))));
    let mut client = open(&broker).await;

    broker
        .broadcast(Command::new(client.id.clone(), CommandType::Echo, "ping"))
        .await
        .unwrap();

    let reply = crate::assert_command!(next_pushed(&mut client.rx).await, CommandType::Echo);
    assert_eq!(reply.data, "echo: ping");
}

#[tokio::test]
async fn test_join_counts_presence() {
    let backend: Arc<dyn PubSubBackend> = Arc::new(MemoryPubSub::new(Duration::from_millis(500)));
    let broker = spawn_broker(backend.clone());
    let mut client = open(&broker).await;

    broker
        .broadcast(Command::new(client.id.clone(), CommandType::Join, "room"))
        .await
        .unwrap();
    let joined = crate::assert_command!(next_pushed(&mut client.rx).await, CommandType::Joined);
    assert_eq!(joined.channel, "room");
    tokio::time::sleep(SETTLE).await;
    assert_eq!(counter(&backend, "presence:room").await, "1");

    broker
        .broadcast(Command::new(client.id.clone(), CommandType::Presence, "").with_channel("room"))
        .await
        .unwrap();
    let presence = loop {
        let cmd = next_pushed(&mut client.rx).await;
        if cmd.kind == CommandType::Presence {
            break cmd;
        }
    };
    assert_eq!(presence.data, "1");
    assert_eq!(presence.channel, "room");
}

#[tokio::test]
async fn test_presence_of_unknown_channel_is_zero() {
    let broker = spawn_broker(Arc::new(MemoryPubSub::new(Duration::from_millis(500))));
    let mut client = open(&broker).await;

    broker
        .broadcast(Command::new(client.id.clone(), CommandType::Presence, "empty"))
        .await
        .unwrap();
    let presence = crate::assert_command!(next_pushed(&mut client.rx).await, CommandType::Presence);
    assert_eq!(presence.data, "0");
}

#[tokio::test]
async fn test_join_is_announced_to_channel() {
    let broker = spawn_broker(Arc::new(MemoryPubSub::new(Duration::from_millis(500))));
    let mut first = open(&broker).await;
    let second = open(&broker).await;

    broker
        .broadcast(Command::new(first.id.clone(), CommandType::Join, "room"))
        .await
        .unwrap();
    crate::assert_command!(next_pushed(&mut first.rx).await, CommandType::Joined);
    tokio::time::sleep(SETTLE).await;

    broker
        .broadcast(Command::new(second.id.clone(), CommandType::Join, "room"))
        .await
        .unwrap();

    let announcement = loop {
        let cmd = next_pushed(&mut first.rx).await;
        if cmd.kind == CommandType::Joined && cmd.sender_id == second.id {
            break cmd;
        }
    };
    assert_eq!(announcement.data, "room");
    assert_eq!(announcement.channel, "room");
}

#[tokio::test]
async fn test_publish_between_push_clients() {
    let broker = spawn_broker(Arc::new(MemoryPubSub::new(Duration::from_millis(500))));
    let mut reader = open(&broker).await;
    let mut writer = open(&broker).await;

    broker
        .broadcast(Command::new(reader.id.clone(), CommandType::Join, "feed"))
        .await
        .unwrap();
    crate::assert_command!(next_pushed(&mut reader.rx).await, CommandType::Joined);
    tokio::time::sleep(SETTLE).await;

    broker
        .broadcast(Command::new(writer.id.clone(), CommandType::ChanIn, "news").with_channel("feed"))
        .await
        .unwrap();

    crate::assert_command!(next_pushed(&mut writer.rx).await, CommandType::Ok);
    let delivered = loop {
        let cmd = next_pushed(&mut reader.rx).await;
        if cmd.kind == CommandType::ChanOut {
            break cmd;
        }
    };
    assert_eq!(delivered.data, "news");
    assert_eq!(delivered.sender_id, writer.id);
}

#[tokio::test]
async fn test_closing_stream_releases_presence() {
    let backend: Arc<dyn PubSubBackend> = Arc::new(MemoryPubSub::new(Duration::from_millis(500)));
    let broker = spawn_broker(backend.clone());
    let mut client = open(&broker).await;

    broker
        .broadcast(Command::new(client.id.clone(), CommandType::Join, "room"))
        .await
        .unwrap();
    crate::assert_command!(next_pushed(&mut client.rx).await, CommandType::Joined);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(counter(&backend, "presence:room").await, "1");

    drop(client.rx);
    tokio::time::timeout(RECV_DEADLINE, client.task)
        .await
        .expect("accept did not return")
        .unwrap();

    let mut count = String::new();
    for _ in 0..20 {
        count = counter(&backend, "presence:room").await;
        if count == "0" {
            break;
        }
        tokio::time::sleep(SETTLE).await;
    }
    assert_eq!(count, "0");
}

#[tokio::test]
async fn test_commands_from_unknown_connections_are_ignored() {
    let backend = CountingBackend::new();
    let broker = spawn_broker(backend.clone());
    let mut client = open(&broker).await;

    broker
        .broadcast(Command::new("nobody", CommandType::ChanIn, "x").with_channel("room"))
        .await
        .unwrap();
    broker
        .broadcast(Command::new(client.id.clone(), CommandType::Echo, "still here"))
        .await
        .unwrap();

    let reply = crate::assert_command!(next_pushed(&mut client.rx).await, CommandType::Echo);
    assert_eq!(reply.data, "echo: still here");
    assert_eq!(backend.publish_count(), 0);
}

#[tokio::test]
async fn test_slow_push_client_is_dropped_and_stream_ends() {
    let broker = Broker::spawn(router_context(Arc::new(MemoryPubSub::new(Duration::from_millis(500)))), 2);
    let mut slow = open(&broker).await;

    for _ in 0..5 {
        broker
            .broadcast(Command::new(slow.id.clone(), CommandType::Echo, "x"))
            .await
            .unwrap();
    }

    let mut received = 0;
    let ended = loop {
        match tokio::time::timeout(RECV_DEADLINE, slow.rx.recv()).await {
            Ok(Some(_)) => received += 1,
            Ok(None) => break true,
            Err(_) => break false,
        }
    };
    assert_eq!(received, 2);
    assert!(ended, "stream of a dropped connection stayed open");

    tokio::time::timeout(RECV_DEADLINE, slow.task)
        .await
        .expect("accept did not return")
        .unwrap();
}
