/**
 * Realtime Command Protocol
 *
 * This module defines the single envelope type exchanged between clients
 * and the server over every realtime transport (WebSocket and SSE), and
 * between processes over the pub/sub backend.
 *
 * # Wire Format
 *
 * ```json
 * {"sid": "c0ffee", "type": "chan_in", "data": "hello", "channel": "room-1", "token": "..."}
 * ```
 *
 * The `sys` field only ever appears on copies republished onto the
 * system channel. Transports reset it on every inbound client message.
 */
use serde::{Deserialize, Serialize};

/// Sender ID used for messages originated by the server itself
pub const SYSTEM_SENDER: &str = "sb";

/// Channel used to fan out every published message to trigger consumers
pub const SYSTEM_CHANNEL: &str = "sbsys";

/// Prefix of the system-managed document change channels
pub const DB_CHANNEL_PREFIX: &str = "db-";

/// Type of a realtime command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    /// Server tells a new connection its own ID
    Init,
    /// Client asks the server to echo data back
    Echo,
    /// Client presents a signed token
    Auth,
    /// Server accepted an auth token
    Token,
    /// Client subscribes to a channel
    Join,
    /// Server confirms (or announces) a join
    Joined,
    /// Client asks for the online count of a channel
    Presence,
    /// Client publishes into a channel
    ChanIn,
    /// Message delivered from a channel
    ChanOut,
    /// A document was created
    DbCreated,
    /// A document was updated
    DbUpdated,
    /// A document was deleted
    DbDeleted,
    /// Error reply
    Error,
    /// Success reply
    Ok,
    /// Anything the server does not understand
    #[serde(other)]
    Unknown,
}

impl CommandType {
    /// True for the document change notifications subject to ACL filtering
    pub fn is_document_event(self) -> bool {
        matches!(self, Self::DbCreated | Self::DbUpdated | Self::DbDeleted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Echo => "echo",
            Self::Auth => "auth",
            Self::Token => "token",
            Self::Join => "join",
            Self::Joined => "joined",
            Self::Presence => "presence",
            Self::ChanIn => "chan_in",
            Self::ChanOut => "chan_out",
            Self::DbCreated => "db_created",
            Self::DbUpdated => "db_updated",
            Self::DbDeleted => "db_deleted",
            Self::Error => "error",
            Self::Ok => "ok",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The protocol envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    /// Originating connection ID, or [`SYSTEM_SENDER`]
    #[serde(rename = "sid", default)]
    pub sender_id: String,
    #[serde(rename = "type")]
    pub kind: CommandType,
    /// Opaque payload: document JSON, token or free text
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub channel: String,
    /// Session token of the issuing client
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Marks the copy fanned out on [`SYSTEM_CHANNEL`]
    #[serde(rename = "sys", default, skip_serializing_if = "is_false")]
    pub is_system_event: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Command {
    pub fn new(sender_id: impl Into<String>, kind: CommandType, data: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            kind,
            data: data.into(),
            channel: String::new(),
            token: String::new(),
            is_system_event: false,
        }
    }

    /// Server-originated command
    pub fn system(kind: CommandType, data: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, kind, data)
    }

    /// Error reply carrying a human readable reason
    pub fn error(reason: impl Into<String>) -> Self {
        Self::system(CommandType::Error, reason)
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Copy of this command destined for the system channel
    pub fn to_system_event(&self) -> Self {
        let mut copy = self.clone();
        copy.is_system_event = true;
        copy.token.clear();
        copy
    }

    /// Parse a command received from a client.
    ///
    /// The system flag is never trusted from the outside.
    pub fn from_client(raw: &str) -> Result<Self, serde_json::Error> {
        let mut cmd: Command = serde_json::from_str(raw)?;
        cmd.is_system_event = false;
        Ok(cmd)
    }
}

/// True if clients may not publish into this channel directly
pub fn is_reserved_channel(channel: &str) -> bool {
    channel.to_ascii_lowercase().starts_with(DB_CHANNEL_PREFIX) || channel == SYSTEM_CHANNEL
}
