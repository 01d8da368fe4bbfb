//! Admin notification badge counters.

use serde::{Deserialize, Serialize};

/// The three badge counters shown in the admin console.
///
/// `unread_messages` and `pending_support_requests` are replaced wholesale by
/// the periodic poll; `unassigned_live_chats` moves by discrete push deltas
/// and by admin actions. Decrements clamp at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCounters {
    pub unread_messages: u32,
    pub pending_support_requests: u32,
    pub unassigned_live_chats: u32,
}

impl NotificationCounters {
    pub fn increment_live_chats(&mut self) {
        self.unassigned_live_chats += 1;
    }

    pub fn decrement_live_chats(&mut self) {
        self.unassigned_live_chats = self.unassigned_live_chats.saturating_sub(1);
    }

    pub fn total(&self) -> u32 {
        self.unread_messages + self.pending_support_requests + self.unassigned_live_chats
    }
}
