/**
 * Trigger Runner
 *
 * Subscribes to the system channel and hands every document change to the
 * matching handlers. Handlers run one after another in arrival order; a
 * failing handler is logged and never stops the runner.
 */

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::backend::error::PubSubError;
use crate::backend::pubsub::PubSubBackend;
use crate::backend::triggers::registry::{TriggerEvent, TriggerRegistry};
use crate::shared::{Command, SYSTEM_CHANNEL};

const SYSTEM_QUEUE_CAPACITY: usize = 1024;

pub struct TriggerRunner {
    backend: Arc<dyn PubSubBackend>,
    registry: Arc<TriggerRegistry>,
}

impl TriggerRunner {
    pub fn new(backend: Arc<dyn PubSubBackend>, registry: Arc<TriggerRegistry>) -> Self {
        Self { backend, registry }
    }

    /// Run handlers matching one system channel copy, returning how many ran
    pub async fn dispatch(&self, cmd: &Command) -> usize {
        let Some(event) = TriggerEvent::from_system_copy(cmd) else {
            return 0;
        };

        let handlers = self.registry.handlers_for(&event.collection, event.kind);
        for handler in handlers {
            if let Err(e) = handler.handle(&event).await {
                tracing::error!("[Triggers] Handler for {} on {} failed: {}", event.kind, event.collection, e);
            }
        }
        handlers.len()
    }

    /// Start consuming in the background; the runner stops when the
    /// returned handle is stopped or dropped
    pub fn spawn(self) -> TriggerHandle {
        let (stop, close) = oneshot::channel();
        let task = tokio::spawn(async move {
            if let Err(e) = self.run(close).await {
                tracing::error!("[Triggers] Runner failed: {}", e);
            }
        });
        TriggerHandle { stop: Some(stop), task }
    }

    /// Consume the system channel until `close` fires
    pub async fn run(self, close: oneshot::Receiver<()>) -> Result<(), PubSubError> {
        let (tx, mut rx) = mpsc::channel(SYSTEM_QUEUE_CAPACITY);
        let backend = self.backend.clone();
        let subscription = tokio::spawn(async move {
            backend
                .subscribe(tx, String::new(), SYSTEM_CHANNEL.to_string(), close)
                .await
        });
        tracing::info!("[Triggers] Listening on {} with {} handlers", SYSTEM_CHANNEL, self.registry.len());

        while let Some(cmd) = rx.recv().await {
            self.dispatch(&cmd).await;
        }

        tracing::info!("[Triggers] Runner stopped");
        subscription
            .await
            .map_err(|e| PubSubError::Transport(format!("trigger subscription panicked: {}", e)))?
    }
}

/// Keeps a spawned runner alive
pub struct TriggerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl TriggerHandle {
    /// Stop the runner and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }
}
