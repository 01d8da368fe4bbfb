//! Support-request and contact-message models.
//!
//! These feed the polled badge counters: the poller replaces the counts with
//! the number of items matching the pending/new predicates below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a support request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    Pending,
    InProgress,
    Resolved,
    Closed,
}

/// A customer support request (ticket).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportRequest {
    pub id: String,
    pub subject: String,
    pub customer_email: String,
    pub status: SupportStatus,
    pub created_at: DateTime<Utc>,
}

impl SupportRequest {
    /// Whether this request counts toward the pending badge.
    pub fn is_pending(&self) -> bool {
        self.status == SupportStatus::Pending
    }
}

/// Read status of a contact-form message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    New,
    Read,
    Archived,
}

/// A message submitted through the contact form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub sender_name: String,
    pub sender_email: String,
    pub body: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    /// Whether this message counts toward the unread badge.
    pub fn is_unread(&self) -> bool {
        self.status == MessageStatus::New
    }
}
