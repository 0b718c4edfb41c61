/**
 * Bounded-Wait Delivery
 *
 * Subscribers write into bounded per-connection queues. A slow consumer
 * must not stall the task fanning messages out, so every write has a
 * deadline; late messages are dropped, never retried.
 */

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::backend::pubsub::{filter, PubSubBackend};
use crate::shared::Command;

/// What happened to one message handed to a subscriber queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Queue stayed full past the deadline, message dropped
    TimedOut,
    /// Queue consumer is gone
    Closed,
}

/// Try to enqueue `item`, giving up after `deadline`
pub async fn send_with_deadline<T>(tx: &mpsc::Sender<T>, item: T, deadline: Duration) -> SendOutcome {
    match tx.send_timeout(item, deadline).await {
        Ok(()) => SendOutcome::Delivered,
        Err(SendTimeoutError::Timeout(_)) => SendOutcome::TimedOut,
        Err(SendTimeoutError::Closed(_)) => SendOutcome::Closed,
    }
}

/// Whether a subscription loop keeps running after forwarding a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

/// Filter and forward one inbound message to a subscriber.
///
/// `close` is polled first so cancellation preempts a blocked send.
pub(crate) async fn forward<B>(
    backend: &B,
    receiver: &mpsc::Sender<Command>,
    token: &str,
    channel: &str,
    msg: Command,
    deadline: Duration,
    close: &mut oneshot::Receiver<()>,
) -> Flow
where
    B: PubSubBackend + ?Sized,
{
    let deliver = async {
        if !filter::permits(backend, token, channel, &msg).await {
            return None;
        }
        let kind = msg.kind;
        Some((kind, send_with_deadline(receiver, msg, deadline).await))
    };

    tokio::select! {
        biased;
        _ = &mut *close => Flow::Stop,
        outcome = deliver => match outcome {
            None | Some((_, SendOutcome::Delivered)) => Flow::Continue,
            Some((kind, SendOutcome::TimedOut)) => {
                tracing::warn!(
                    "[PubSub] Subscriber on {} did not accept {} within {:?}, dropping message",
                    channel,
                    kind,
                    deadline
                );
                Flow::Continue
            }
            Some((_, SendOutcome::Closed)) => Flow::Stop,
        },
    }
}
