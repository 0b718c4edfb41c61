/**
 * Command Routing
 *
 * One routing table shared by the full-duplex hub and the push-only
 * broker. Connection state lives in a [`ConnectionRegistry`] owned by a
 * single coordinating task; the dispatcher only touches it from that task.
 *
 * # Routing Table
 *
 * | type       | action                                                    |
 * |------------|-----------------------------------------------------------|
 * | `echo`     | reply `echo` with `"echo: " + data` to the sender          |
 * | `auth`     | verify + cache the token, reply `token` (or `error`)       |
 * | `join`     | open a subscription, reply `joined`                        |
 * | `chan_in`  | publish as `chan_out`, reply `ok` (or `error`)             |
 * | `presence` | push-only: reply with the channel's online counter         |
 * | other      | reply `error`                                             |
 *
 * Anything needing backend I/O runs in a spawned task whose reply comes
 * back through the coordinator as [`Event::Deliver`], so the coordinator
 * never waits on the network.
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::backend::auth::AuthCache;
use crate::backend::pubsub::PubSubBackend;
use crate::backend::realtime::connections::{presence_key, ConnectionId, ConnectionRegistry, Connections};
use crate::shared::command::is_reserved_channel;
use crate::shared::{Command, CommandType, SYSTEM_CHANNEL};

/// Capabilities of the transport a coordinator serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Clients send and receive on the same socket
    FullDuplex,
    /// Server can only push; clients post commands out of band
    PushOnly,
}

/// Input of a coordinating task
#[derive(Debug)]
pub enum Event {
    Register {
        id: ConnectionId,
        outbound: mpsc::Sender<Command>,
        /// Fired when the coordinator removes the connection
        dropped: Option<oneshot::Sender<()>>,
    },
    Unregister {
        id: ConnectionId,
    },
    /// Command issued by a client; `sender_id` names the connection
    Inbound(Command),
    /// Server reply addressed to one connection
    Deliver {
        to: ConnectionId,
        cmd: Command,
    },
}

/// Settings shared by the hub and the broker
#[derive(Clone)]
pub struct RouterContext {
    pub backend: Arc<dyn PubSubBackend>,
    pub auth: AuthCache,
    /// Delay before a push-only join is announced on the channel
    pub join_announce_delay: Duration,
}

pub struct Dispatcher {
    transport: Transport,
    ctx: RouterContext,
    /// Loop-back into the coordinator for replies of spawned work
    replies: mpsc::WeakSender<Event>,
}

impl Dispatcher {
    pub fn new(transport: Transport, ctx: RouterContext, replies: mpsc::WeakSender<Event>) -> Self {
        Self {
            transport,
            ctx,
            replies,
        }
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Route one client command
    pub fn dispatch<R: ConnectionRegistry>(&self, registry: &mut R, cmd: Command) {
        if !registry.is_registered(&cmd.sender_id) {
            tracing::debug!("[Realtime] Ignoring {} from unknown connection {}", cmd.kind, cmd.sender_id);
            return;
        }

        match cmd.kind {
            CommandType::Echo => {
                let reply = Command::system(CommandType::Echo, format!("echo: {}", cmd.data));
                registry.deliver(&cmd.sender_id, reply);
            }
            CommandType::Auth => self.authenticate(cmd),
            CommandType::Join => self.join(registry, cmd),
            CommandType::ChanIn => self.publish(registry, cmd),
            CommandType::Presence if self.transport == Transport::PushOnly => self.presence(cmd),
            other => {
                registry.deliver(&cmd.sender_id, Command::error(format!("unknown command type: {}", other)));
            }
        }
    }

    fn authenticate(&self, cmd: Command) {
        let auth = self.ctx.auth.clone();
        self.spawn_reply(cmd.sender_id, async move {
            match auth.authenticate(&cmd.data).await {
                Ok(_) => Command::system(CommandType::Token, cmd.data),
                Err(e) => {
                    tracing::info!("[Realtime] Rejected auth token: {}", e);
                    Command::error(format!("invalid token: {}", e))
                }
            }
        });
    }

    fn join<R: ConnectionRegistry>(&self, registry: &mut R, cmd: Command) {
        let channel = if cmd.data.is_empty() { cmd.channel.clone() } else { cmd.data.clone() };
        if channel.is_empty() {
            registry.deliver(&cmd.sender_id, Command::error("no channel was specified"));
            return;
        }
        if channel == SYSTEM_CHANNEL {
            registry.deliver(&cmd.sender_id, Command::error("this channel is reserved"));
            return;
        }

        let Some((outbound, close)) = registry.open_subscription(&cmd.sender_id, &channel) else {
            return;
        };

        let backend = self.ctx.backend.clone();
        let task_channel = channel.clone();
        let sender = cmd.sender_id.clone();
        let token = cmd.token;
        tokio::spawn(async move {
            if let Err(e) = backend.subscribe(outbound, token, task_channel.clone(), close).await {
                tracing::error!("[Realtime] Subscription of {} to {} failed: {}", sender, task_channel, e);
            }
        });

        let joined = Command::system(CommandType::Joined, channel.clone()).with_channel(channel.clone());
        registry.deliver(&cmd.sender_id, joined);

        if self.transport == Transport::PushOnly {
            self.announce_join(cmd.sender_id, channel);
        }
    }

    /// Let existing subscribers see the join once the new subscription has
    /// had time to attach
    fn announce_join(&self, sender: ConnectionId, channel: String) {
        let backend = self.ctx.backend.clone();
        let delay = self.ctx.join_announce_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let announcement = Command::new(sender, CommandType::Joined, channel.clone()).with_channel(channel.clone());
            if let Err(e) = backend.publish(announcement).await {
                tracing::warn!("[Realtime] Failed to announce join on {}: {}", channel, e);
            }
        });
    }

    fn publish<R: ConnectionRegistry>(&self, registry: &mut R, cmd: Command) {
        if cmd.channel.is_empty() {
            registry.deliver(&cmd.sender_id, Command::error("no channel was specified"));
            return;
        }
        if is_reserved_channel(&cmd.channel) {
            registry.deliver(&cmd.sender_id, Command::error("you cannot write to a reserved channel"));
            return;
        }

        let mut outgoing = cmd;
        outgoing.kind = CommandType::ChanOut;
        outgoing.token.clear();
        outgoing.is_system_event = false;

        let backend = self.ctx.backend.clone();
        let sender = outgoing.sender_id.clone();
        self.spawn_reply(sender, async move {
            let channel = outgoing.channel.clone();
            match backend.publish(outgoing).await {
                Ok(()) => Command::system(CommandType::Ok, "").with_channel(channel),
                Err(e) => {
                    tracing::error!("[Realtime] Publish on {} failed: {}", channel, e);
                    Command::error(format!("unable to publish: {}", e)).with_channel(channel)
                }
            }
        });
    }

    fn presence(&self, cmd: Command) {
        let channel = if cmd.channel.is_empty() { cmd.data } else { cmd.channel };
        let backend = self.ctx.backend.clone();
        self.spawn_reply(cmd.sender_id, async move {
            let count = match backend.get(&presence_key(&channel)).await {
                Ok(count) => count,
                Err(e) if e.is_not_found() => "0".to_string(),
                Err(e) => return Command::error(format!("unable to read presence: {}", e)),
            };
            Command::system(CommandType::Presence, count).with_channel(channel)
        });
    }

    fn spawn_reply<F>(&self, to: ConnectionId, work: F)
    where
        F: std::future::Future<Output = Command> + Send + 'static,
    {
        let Some(replies) = self.replies.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let cmd = work.await;
            // Coordinator gone means every connection is gone too.
            let _ = replies.send(Event::Deliver { to, cmd }).await;
        });
    }
}

/// Coordinating task of a hub or broker: sole owner of its connections
pub struct Coordinator {
    dispatcher: Dispatcher,
    connections: Connections,
    events: mpsc::Receiver<Event>,
}

impl Coordinator {
    pub fn new(dispatcher: Dispatcher, connections: Connections, events: mpsc::Receiver<Event>) -> Self {
        Self {
            dispatcher,
            connections,
            events,
        }
    }

    /// Process events until every handle to this coordinator is dropped
    pub async fn run(mut self) {
        let tag = match self.dispatcher.transport() {
            Transport::FullDuplex => "Hub",
            Transport::PushOnly => "Broker",
        };
        tracing::info!("[{}] Coordinator started", tag);

        while let Some(event) = self.events.recv().await {
            match event {
                Event::Register { id, outbound, dropped } => {
                    tracing::info!("[{}] Connection {} registered", tag, id);
                    self.connections.register_watched(id.clone(), outbound, dropped);
                    self.connections.deliver(&id, Command::system(CommandType::Init, id.clone()));
                }
                Event::Unregister { id } => {
                    self.connections.unregister(&id);
                }
                Event::Inbound(cmd) => self.dispatcher.dispatch(&mut self.connections, cmd),
                Event::Deliver { to, cmd } => {
                    self.connections.deliver(&to, cmd);
                }
            }
        }

        let ids: Vec<ConnectionId> = self.connections.ids();
        for id in ids {
            self.connections.unregister(&id);
        }
        tracing::info!("[{}] Coordinator stopped", tag);
    }
}
