/**
 * Connection Hub
 *
 * Coordinator for full-duplex (WebSocket) connections. Each connection
 * moves through `Connecting -> Registered -> (Subscribed)* -> Closed`:
 * [`Hub::connect`] registers it and queues its `init` command, commands
 * arrive through [`Hub::submit`], and [`Hub::disconnect`] (or a failed
 * delivery) cancels its subscriptions and closes its queue.
 *
 * All connection state is owned by the hub's single coordinating task.
 */

use tokio::sync::mpsc;

use crate::backend::error::BackendError;
use crate::backend::realtime::connections::{new_connection_id, ConnectionId, Connections};
use crate::backend::realtime::router::{Coordinator, Dispatcher, Event, RouterContext, Transport};
use crate::shared::Command;

const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Handle to a running hub
#[derive(Clone)]
pub struct Hub {
    events: mpsc::Sender<Event>,
    outbound_capacity: usize,
}

impl Hub {
    /// Start the hub's coordinating task
    pub fn spawn(ctx: RouterContext, outbound_capacity: usize) -> Self {
        let (events, inbox) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let dispatcher = Dispatcher::new(Transport::FullDuplex, ctx, events.downgrade());
        tokio::spawn(Coordinator::new(dispatcher, Connections::new(), inbox).run());

        Self {
            events,
            outbound_capacity,
        }
    }

    /// Register a new connection; its first outbound command is `init`
    pub async fn connect(&self) -> Result<HubConnection, BackendError> {
        let id = new_connection_id();
        let (outbound_tx, outbound) = mpsc::channel(self.outbound_capacity);
        self.send(Event::Register {
            id: id.clone(),
            outbound: outbound_tx,
            dropped: None,
        })
        .await?;

        Ok(HubConnection {
            id,
            outbound,
            hub: self.clone(),
        })
    }

    /// Route a command read from connection `id`
    pub async fn submit(&self, id: &str, mut cmd: Command) -> Result<(), BackendError> {
        cmd.sender_id = id.to_string();
        cmd.is_system_event = false;
        self.send(Event::Inbound(cmd)).await
    }

    /// Queue a server reply for connection `id`
    pub async fn reply(&self, id: &str, cmd: Command) -> Result<(), BackendError> {
        self.send(Event::Deliver {
            to: id.to_string(),
            cmd,
        })
        .await
    }

    /// Tear down connection `id`; unknown IDs are ignored
    pub async fn disconnect(&self, id: &str) -> Result<(), BackendError> {
        self.send(Event::Unregister { id: id.to_string() }).await
    }

    async fn send(&self, event: Event) -> Result<(), BackendError> {
        self.events
            .send(event)
            .await
            .map_err(|_| BackendError::state("hub is not running"))
    }
}

/// A registered hub connection as seen by its transport
pub struct HubConnection {
    id: ConnectionId,
    outbound: mpsc::Receiver<Command>,
    hub: Hub,
}

impl HubConnection {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Send a command as this connection
    pub async fn send(&self, cmd: Command) -> Result<(), BackendError> {
        self.hub.submit(&self.id, cmd).await
    }

    /// Next command queued for this connection, `None` once it is closed
    pub async fn recv(&mut self) -> Option<Command> {
        self.outbound.recv().await
    }

    pub async fn close(&self) -> Result<(), BackendError> {
        self.hub.disconnect(&self.id).await
    }

    /// Split into the ID and the outbound queue for a write pump
    pub fn into_parts(self) -> (ConnectionId, mpsc::Receiver<Command>) {
        (self.id, self.outbound)
    }
}
