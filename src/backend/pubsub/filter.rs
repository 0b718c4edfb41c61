//! Delivery filter for document change events.
//!
//! Runs inside every subscription for each inbound message. Only
//! `db_created`, `db_updated` and `db_deleted` are inspected; everything
//! else passes untouched.

use serde_json::{Map, Value};

use crate::backend::pubsub::{PubSubBackend, PubSubExt};
use crate::shared::{read_permission, Auth, Command, PermissionLevel, DB_CHANNEL_PREFIX};

const ACCOUNT_FIELD: &str = "accountId";
const OWNER_FIELD: &str = "ownerId";

/// Whether the subscriber holding `token` may receive `msg` on `channel`
pub async fn permits<B>(backend: &B, token: &str, channel: &str, msg: &Command) -> bool
where
    B: PubSubBackend + ?Sized,
{
    if !msg.kind.is_document_event() {
        return true;
    }
    if msg.is_system_event {
        return true;
    }

    let auth: Auth = match backend.get_typed(token).await {
        Ok(auth) => auth,
        Err(e) => {
            tracing::debug!("[PubSub] No auth for subscriber on {}: {}", channel, e);
            return false;
        }
    };

    let document: Map<String, Value> = match serde_json::from_str(&msg.data) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("[PubSub] Undecodable document on {}: {}", channel, e);
            return false;
        }
    };

    document_visible(&auth, collection_of(channel), &document)
}

/// Collection name a document channel carries events for
pub fn collection_of(channel: &str) -> &str {
    channel.strip_prefix(DB_CHANNEL_PREFIX).unwrap_or(channel)
}

/// Read check of one decoded document against one session
pub fn document_visible(auth: &Auth, collection: &str, document: &Map<String, Value>) -> bool {
    let field_is = |field: &str, expected: &str| document.get(field).and_then(Value::as_str) == Some(expected);

    match read_permission(collection) {
        PermissionLevel::Everyone => true,
        PermissionLevel::Group => field_is(ACCOUNT_FIELD, &auth.account_id),
        PermissionLevel::Owner => field_is(ACCOUNT_FIELD, &auth.account_id) && field_is(OWNER_FIELD, &auth.user_id),
    }
}
