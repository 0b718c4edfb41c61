/**
 * Event Broker
 *
 * Coordinator for push-only (Server-Sent Events) connections. It shares
 * the hub's routing table and adds:
 *
 * - `presence`: reply with a channel's online counter
 * - join announcements published on the joined channel itself
 *
 * Connections enter through [`Broker::accept`], which lasts as long as the
 * transport keeps the connection's queue open. Commands from clients (or
 * anything else in the process) enter through [`Broker::broadcast`].
 */

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::backend::error::BackendError;
use crate::backend::realtime::connections::{new_connection_id, ConnectionId, Connections};
use crate::backend::realtime::router::{Coordinator, Dispatcher, Event, RouterContext, Transport};
use crate::shared::Command;

const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Handle to a running broker
#[derive(Clone)]
pub struct Broker {
    events: mpsc::Sender<Event>,
    outbound_capacity: usize,
}

impl Broker {
    /// Start the broker's coordinating task
    pub fn spawn(ctx: RouterContext, outbound_capacity: usize) -> Self {
        let (events, inbox) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let connections = Connections::new().with_presence(Arc::clone(&ctx.backend));
        let dispatcher = Dispatcher::new(Transport::PushOnly, ctx, events.downgrade());
        tokio::spawn(Coordinator::new(dispatcher, connections, inbox).run());

        Self {
            events,
            outbound_capacity,
        }
    }

    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    /// Serve one connection whose transport drains `sink`.
    ///
    /// Returns once the transport drops the receiving end or the broker
    /// drops the connection, after the connection has been cleaned up. The
    /// queue is closed on return, so the transport's stream ends as well.
    pub async fn accept(&self, sink: mpsc::Sender<Command>) -> Result<ConnectionId, BackendError> {
        let id = new_connection_id();
        let (dropped_tx, dropped) = oneshot::channel();
        self.send(Event::Register {
            id: id.clone(),
            outbound: sink.clone(),
            dropped: Some(dropped_tx),
        })
        .await?;

        tokio::select! {
            _ = sink.closed() => {
                tracing::info!("[Broker] Stream of {} closed by transport", id);
                drop(sink);
                self.send(Event::Unregister { id: id.clone() }).await?;
            }
            _ = dropped => {
                tracing::info!("[Broker] Connection {} dropped, ending its stream", id);
                drop(sink);
            }
        }
        Ok(id)
    }

    /// Inject a command for routing; `sender_id` names the issuing connection
    pub async fn broadcast(&self, mut cmd: Command) -> Result<(), BackendError> {
        cmd.is_system_event = false;
        self.send(Event::Inbound(cmd)).await
    }

    async fn send(&self, event: Event) -> Result<(), BackendError> {
        self.events
            .send(event)
            .await
            .map_err(|_| BackendError::state("broker is not running"))
    }
}
