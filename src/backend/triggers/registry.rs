/**
 * Trigger Registry
 *
 * Maps `(collection base name, event type)` to the handlers that run when
 * such a change is observed on the system channel.
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::error::BackendError;
use crate::backend::pubsub::filter::collection_of;
use crate::shared::permission::base_name;
use crate::shared::{Command, CommandType, DB_CHANNEL_PREFIX};

/// A document change as seen by a trigger handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Collection base name, permission suffix removed
    pub collection: String,
    /// Channel the change was published on
    pub channel: String,
    pub kind: CommandType,
    /// Raw document JSON
    pub document: String,
}

impl TriggerEvent {
    /// Extract a trigger event from a system channel copy.
    ///
    /// Anything that is not a document change on a `db-` channel yields `None`.
    pub fn from_system_copy(cmd: &Command) -> Option<Self> {
        if !cmd.kind.is_document_event() || !cmd.channel.starts_with(DB_CHANNEL_PREFIX) {
            return None;
        }

        Some(Self {
            collection: base_name(collection_of(&cmd.channel)).to_string(),
            channel: cmd.channel.clone(),
            kind: cmd.kind,
            document: cmd.data.clone(),
        })
    }

    /// Decode the document into a JSON value
    pub fn document_json(&self) -> Result<serde_json::Value, BackendError> {
        Ok(serde_json::from_str(&self.document)?)
    }
}

/// Server-side function run on a document change
#[async_trait]
pub trait TriggerHandler: Send + Sync {
    async fn handle(&self, event: &TriggerEvent) -> Result<(), BackendError>;
}

#[derive(Default)]
pub struct TriggerRegistry {
    handlers: HashMap<(String, CommandType), Vec<Arc<dyn TriggerHandler>>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` whenever `kind` happens in `collection`.
    ///
    /// `collection` may carry a permission suffix; it is keyed by base name.
    pub fn register(&mut self, collection: &str, kind: CommandType, handler: Arc<dyn TriggerHandler>) {
        let key = (base_name(collection).to_string(), kind);
        tracing::info!("[Triggers] Registered handler for {} on {}", key.1, key.0);
        self.handlers.entry(key).or_default().push(handler);
    }

    pub fn handlers_for(&self, collection: &str, kind: CommandType) -> &[Arc<dyn TriggerHandler>] {
        self.handlers
            .get(&(collection.to_string(), kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
