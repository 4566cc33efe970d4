use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events sent FROM client TO server over the realtime channel.
///
/// Wire format is `{"type": "<event name>", "data": {...}}`; the variant
/// renames carry the event names the clients speak.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    /// Join a room (and implicitly leave any previous one).
    #[serde(rename = "join room")]
    JoinRoom { username: String, room: String },

    /// Send a chat message to a room.
    #[serde(rename = "chat message")]
    ChatMessage {
        username: String,
        room: String,
        message: String,
    },

    /// The user started typing.
    #[serde(rename = "typing")]
    Typing { username: String, room: String },

    /// The user stopped typing.
    #[serde(rename = "stop typing")]
    StopTyping { room: String },
}

/// Events broadcast to room members over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "user joined")]
    UserJoined { username: String, message: String },

    /// A chat message, stamped with the server-assigned timestamp.
    #[serde(rename = "chat message")]
    ChatMessage {
        username: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "user typing")]
    UserTyping { username: String },

    /// No payload; clients clear their typing indicator on the name alone.
    #[serde(rename = "user stop typing")]
    UserStopTyping,

    #[serde(rename = "user left")]
    UserLeft { username: String, message: String },
}
