//! Live-chat domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who sent a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    Customer,
    Admin,
    System,
}

/// One message inside a chat session, ordered by server-assigned timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub chat_id: String,
    pub sender: ChatSender,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// One active customer conversation as seen from the admin console.
///
/// At most one admin is assigned to a session at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub chat_id: String,
    pub user_name: String,
    pub user_phone: Option<String>,
    pub preferred_language: Option<String>,
    pub has_admin: bool,
    pub last_message_time: Option<DateTime<Utc>>,
    pub message_count: u32,
}

/// Participant metadata for the conversation an admin currently has open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_name: String,
    pub user_phone: Option<String>,
    pub preferred_language: Option<String>,
}
