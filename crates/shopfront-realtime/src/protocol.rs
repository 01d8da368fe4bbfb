//! Wire protocol for the admin WebSocket channel.
//!
//! Messages are JSON with a `type` discriminator and camelCase fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopfront_core::chat::{ChatMessage, ChatSender, ChatSession};

/// Server-to-client push events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Handshake acknowledgement. Initial counters come from polling, not
    /// from a socket snapshot, so there is nothing to do with this.
    ConnectionEstablished,
    /// Full replacement of the active session list.
    ActiveSessions { sessions: Vec<ChatSession> },
    /// A customer opened a new chat.
    NewChat { session: ChatSession },
    /// Confirmation of a join, with message history.
    ChatJoined {
        chat_id: String,
        user_name: String,
        user_phone: Option<String>,
        preferred_language: Option<String>,
        messages: Vec<ChatMessage>,
    },
    /// A message in some conversation.
    ChatMessage {
        chat_id: String,
        sender: ChatSender,
        content: String,
        sent_at: DateTime<Utc>,
    },
    /// The server removed a conversation from the active set.
    ChatEnded { chat_id: String },
    /// The customer's socket dropped; the conversation stays open.
    ParticipantDisconnected { chat_id: String },
    /// A message arrived in a chat no admin has joined.
    UnassignedMessage { chat_id: String },
    /// Server-side error report.
    Error { message: String },
    /// Forward-compatible catch-all; unrecognized types are ignored.
    #[serde(other)]
    Unknown,
}

/// Client-to-server requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinChat { chat_id: String },
    Message { chat_id: String, content: String },
    EndChat { chat_id: String },
}
