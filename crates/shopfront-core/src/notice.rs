//! User-facing notice channel.
//!
//! Subsystem failures and confirmations are converted into notices at the
//! subsystem boundary and broadcast to whatever surface renders them (toast
//! layer, console output). Nothing here is allowed to be fatal.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Notice severity, mapped to toast styling by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

/// Type alias for the notice sender.
pub type NoticeSender = broadcast::Sender<Notice>;

/// Type alias for the notice receiver.
pub type NoticeReceiver = broadcast::Receiver<Notice>;

/// Create a new notice channel with default capacity.
pub fn create_notice_channel() -> NoticeSender {
    let (tx, _rx) = broadcast::channel(100);
    tx
}
