//! Periodic counter poll.
//!
//! Support requests and contact messages are not latency-sensitive enough to
//! warrant push, so their badge counts come from a fixed-interval poll that
//! replaces the counters wholesale.

use std::time::Duration;

use shopfront_api::ApiClient;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::NotificationChannel;

/// Fixed polling interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Polls the REST listings and replaces the two derived counters.
pub struct CounterPoller {
    api: ApiClient,
    channel: NotificationChannel,
    interval: Duration,
}

impl CounterPoller {
    pub fn new(api: ApiClient, channel: NotificationChannel) -> Self {
        Self {
            api,
            channel,
            interval: POLL_INTERVAL,
        }
    }

    /// Override the interval (tests).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run forever on a background task. Abort the handle to stop polling.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        })
    }

    /// One poll round. A failed fetch keeps the previous count rather than
    /// zeroing the badge.
    pub async fn poll_once(&self) {
        match self.api.list_support_requests().await {
            Ok(requests) => {
                let pending = requests.iter().filter(|r| r.is_pending()).count() as u32;
                self.channel.set_pending_support_requests(pending);
                debug!(pending, "Polled support requests");
            }
            Err(e) => warn!(error = %e, "Support request poll failed"),
        }

        match self.api.list_contact_messages().await {
            Ok(messages) => {
                let unread = messages.iter().filter(|m| m.is_unread()).count() as u32;
                self.channel.set_unread_messages(unread);
                debug!(unread, "Polled contact messages");
            }
            Err(e) => warn!(error = %e, "Contact message poll failed"),
        }
    }
}
