//! Connection helpers
//!
//! Every receive has a deadline so a missing delivery fails the test
//! instead of hanging it.

use std::sync::Arc;
use std::time::Duration;

use basecast::backend::auth::{AuthCache, TokenVerifier};
use basecast::backend::pubsub::PubSubBackend;
use basecast::backend::realtime::{Broker, Hub, HubConnection, RouterContext};
use basecast::shared::{Auth, Command, CommandType, ServerConfig};
use tokio::sync::mpsc;

pub const TEST_SECRET: &str = "integration-test-secret";

/// How long a test waits for an expected delivery
pub const RECV_DEADLINE: Duration = Duration::from_secs(2);

/// Time given to a freshly spawned subscription to attach
pub const SETTLE: Duration = Duration::from_millis(50);

pub fn test_config() -> ServerConfig {
    ServerConfig::builder()
        .jwt_secret(TEST_SECRET)
        .send_timeout(Duration::from_millis(500))
        .join_announce_delay(Duration::from_millis(20))
        .build()
        .unwrap()
}

pub fn router_context(backend: Arc<dyn PubSubBackend>) -> RouterContext {
    let config = test_config();
    RouterContext {
        auth: AuthCache::new(
            Arc::clone(&backend),
            TokenVerifier::new(TEST_SECRET),
            config.auth_cache_ttl,
        ),
        backend,
        join_announce_delay: config.join_announce_delay,
    }
}

pub fn spawn_hub(backend: Arc<dyn PubSubBackend>) -> Hub {
    Hub::spawn(router_context(backend), 64)
}

pub fn spawn_broker(backend: Arc<dyn PubSubBackend>) -> Broker {
    Broker::spawn(router_context(backend), 64)
}

pub fn issue_token(auth: &Auth) -> String {
    TokenVerifier::new(TEST_SECRET)
        .issue(auth, Duration::from_secs(3600))
        .unwrap()
}

/// Connect and consume the `init` command
pub async fn connect(hub: &Hub) -> HubConnection {
    let mut conn = hub.connect().await.unwrap();
    let init = next(&mut conn).await;
    assert_eq!(init.kind, CommandType::Init);
    assert_eq!(init.data, conn.id());
    conn
}

pub async fn next(conn: &mut HubConnection) -> Command {
    tokio::time::timeout(RECV_DEADLINE, conn.recv())
        .await
        .expect("no command within deadline")
        .expect("connection closed")
}

/// Next command of `kind`, skipping anything else
pub async fn next_of_kind(conn: &mut HubConnection, kind: CommandType) -> Command {
    loop {
        let cmd = next(conn).await;
        if cmd.kind == kind {
            return cmd;
        }
    }
}

/// Fail if anything arrives within `window`
pub async fn assert_quiet(conn: &mut HubConnection, window: Duration) {
    if let Ok(Some(cmd)) = tokio::time::timeout(window, conn.recv()).await {
        panic!("unexpected command: {:?}", cmd);
    }
}

pub async fn next_pushed(rx: &mut mpsc::Receiver<Command>) -> Command {
    tokio::time::timeout(RECV_DEADLINE, rx.recv())
        .await
        .expect("no command within deadline")
        .expect("stream closed")
}

/// Authenticate `conn` and join `channel` carrying its token
pub async fn auth_and_join(conn: &mut HubConnection, auth: &Auth, channel: &str) -> String {
    let token = issue_token(auth);
    conn.send(Command::new("", CommandType::Auth, token.clone())).await.unwrap();
    let reply = next(conn).await;
    assert_eq!(reply.kind, CommandType::Token, "auth failed: {:?}", reply);

    conn.send(Command::new("", CommandType::Join, channel).with_token(token.clone()))
        .await
        .unwrap();
    let joined = next(conn).await;
    assert_eq!(joined.kind, CommandType::Joined);
    token
}
