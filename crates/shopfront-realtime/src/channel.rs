//! Admin notification channel.
//!
//! Maintains exactly one live push connection per admin session and folds
//! push events into the badge counters. Reconnects run off a single owned
//! timer handle: it is always cancelled before a new one is scheduled, so
//! repeated close/error events can never stack timers.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use shopfront_core::counters::NotificationCounters;
use shopfront_core::notice::{Notice, NoticeSender};
use shopfront_core::{ShopfrontError, ShopfrontResult};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::protocol::{ClientEvent, ServerEvent};
use crate::transport::SocketTransport;

/// Fixed delay before a reconnect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Build the channel URL for an admin identity.
pub fn admin_channel_url(ws_url: &str, admin_id: &str, display_name: &str) -> String {
    format!(
        "{}?type=admin&adminId={}&name={}",
        ws_url,
        query_escape(admin_id),
        query_escape(display_name)
    )
}

/// Minimal query-string escaping for the identity parameters.
fn query_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(c),
            ' ' => out.push_str("%20"),
            other => {
                let mut buf = [0u8; 4];
                for byte in other.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    out
}

enum Outbound {
    Text(String),
    Close,
}

struct ConnControl {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    reconnect: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    shutdown: bool,
}

struct ChannelInner {
    transport: Arc<dyn SocketTransport>,
    url: String,
    counters_tx: watch::Sender<NotificationCounters>,
    events_tx: broadcast::Sender<ServerEvent>,
    notices: NoticeSender,
    conn: StdMutex<ConnControl>,
}

/// Handle to the shared admin channel. Cheap to clone; one underlying
/// connection per channel instance.
#[derive(Clone)]
pub struct NotificationChannel {
    inner: Arc<ChannelInner>,
}

impl NotificationChannel {
    pub fn new(transport: Arc<dyn SocketTransport>, url: String, notices: NoticeSender) -> Self {
        let (counters_tx, _) = watch::channel(NotificationCounters::default());
        let (events_tx, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(ChannelInner {
                transport,
                url,
                counters_tx,
                events_tx,
                notices,
                conn: StdMutex::new(ConnControl {
                    state: ConnectionState::Disconnected,
                    outbound: None,
                    reconnect: None,
                    reader: None,
                    shutdown: false,
                }),
            }),
        }
    }

    /// Start connecting. No-op when an attempt is already in flight or the
    /// channel is shut down; a pending reconnect timer is cancelled in favor
    /// of connecting now.
    pub fn connect(&self) {
        self.inner.start_connect();
    }

    /// Close deliberately. No further reconnect is scheduled.
    pub fn shutdown(&self) {
        let mut control = match self.inner.conn.lock() {
            Ok(control) => control,
            Err(poisoned) => poisoned.into_inner(),
        };
        control.shutdown = true;
        control.state = ConnectionState::Disconnected;
        if let Some(timer) = control.reconnect.take() {
            timer.abort();
        }
        match control.outbound.take() {
            Some(tx) => {
                let _ = tx.send(Outbound::Close);
            }
            None => {
                // Still connecting; drop the attempt.
                if let Some(reader) = control.reader.take() {
                    reader.abort();
                }
            }
        }
        info!("Notification channel shut down");
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock_conn().state
    }

    /// Send a client event. Sends are guarded by a readiness check; there is
    /// no store-and-forward for messages composed while disconnected.
    pub fn send(&self, event: &ClientEvent) -> ShopfrontResult<()> {
        let control = self.inner.lock_conn();
        if control.state != ConnectionState::Connected {
            return Err(ShopfrontError::SocketClosed);
        }
        let Some(outbound) = &control.outbound else {
            return Err(ShopfrontError::SocketClosed);
        };
        let json = serde_json::to_string(event)?;
        outbound
            .send(Outbound::Text(json))
            .map_err(|_| ShopfrontError::SocketClosed)
    }

    /// Observe counter changes.
    pub fn counters(&self) -> watch::Receiver<NotificationCounters> {
        self.inner.counters_tx.subscribe()
    }

    /// Current counter snapshot.
    pub fn counters_snapshot(&self) -> NotificationCounters {
        *self.inner.counters_tx.borrow()
    }

    /// Subscribe to the decoded push event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent> {
        self.inner.events_tx.subscribe()
    }

    /// An admin took a chat; clamped at zero.
    pub fn decrement_live_chats(&self) {
        self.inner
            .counters_tx
            .send_modify(|c| c.decrement_live_chats());
    }

    /// Replace the polled unread-messages count.
    pub fn set_unread_messages(&self, count: u32) {
        self.inner
            .counters_tx
            .send_modify(|c| c.unread_messages = count);
    }

    /// Replace the polled pending-support count.
    pub fn set_pending_support_requests(&self, count: u32) {
        self.inner
            .counters_tx
            .send_modify(|c| c.pending_support_requests = count);
    }
}

impl ChannelInner {
    fn lock_conn(&self) -> std::sync::MutexGuard<'_, ConnControl> {
        match self.conn.lock() {
            Ok(control) => control,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn start_connect(self: &Arc<Self>) {
        let mut control = self.lock_conn();
        if control.shutdown {
            return;
        }
        // Connecting now supersedes any pending timer.
        if let Some(timer) = control.reconnect.take() {
            timer.abort();
        }
        if control.state != ConnectionState::Disconnected {
            debug!("Connection attempt already in flight");
            return;
        }
        control.state = ConnectionState::Connecting;

        let inner = Arc::clone(self);
        control.reader = Some(tokio::spawn(async move {
            inner.run_connection().await;
        }));
    }

    async fn run_connection(self: Arc<Self>) {
        let mut conn = match self.transport.connect(&self.url).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Channel connect failed");
                {
                    let mut control = self.lock_conn();
                    control.state = ConnectionState::Disconnected;
                }
                self.schedule_reconnect();
                return;
            }
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let shutdown = {
            let mut control = self.lock_conn();
            if control.shutdown {
                true
            } else {
                control.state = ConnectionState::Connected;
                control.outbound = Some(tx);
                false
            }
        };
        if shutdown {
            conn.close().await;
            return;
        }
        info!("Notification channel connected");

        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = conn.send(text).await {
                            warn!(error = %e, "Channel send failed");
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        conn.close().await;
                        debug!("Channel closed deliberately");
                        return;
                    }
                },
                frame = conn.next_text() => match frame {
                    Some(Ok(text)) => self.handle_frame(&text),
                    Some(Err(e)) => {
                        warn!(error = %e, "Channel receive error");
                        break;
                    }
                    None => {
                        info!("Channel closed by server");
                        break;
                    }
                },
            }
        }

        {
            let mut control = self.lock_conn();
            control.state = ConnectionState::Disconnected;
            control.outbound = None;
        }
        self.schedule_reconnect();
    }

    /// Schedule one reconnect attempt after the fixed delay. If a timer is
    /// already pending, this does nothing.
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut control = self.lock_conn();
        if control.shutdown || control.reconnect.is_some() {
            return;
        }
        if control.state != ConnectionState::Disconnected {
            return;
        }

        debug!(delay_secs = RECONNECT_DELAY.as_secs(), "Scheduling reconnect");
        let inner = Arc::clone(self);
        control.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(RECONNECT_DELAY).await;
            {
                let mut control = inner.lock_conn();
                control.reconnect = None;
            }
            inner.start_connect();
        }));
    }

    /// Decode one inbound frame. Malformed payloads are logged and dropped,
    /// never allowed to crash the channel.
    fn handle_frame(&self, text: &str) {
        let event = match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed push payload");
                return;
            }
        };

        match &event {
            ServerEvent::NewChat { .. } | ServerEvent::UnassignedMessage { .. } => {
                self.counters_tx.send_modify(|c| c.increment_live_chats());
            }
            ServerEvent::Error { message } => {
                warn!(message = %message, "Server reported channel error");
                let _ = self
                    .notices
                    .send(Notice::warning(format!("Live chat error: {message}")));
            }
            ServerEvent::Unknown => {
                debug!("Ignoring unrecognized push event");
                return;
            }
            _ => {}
        }

        let _ = self.events_tx.send(event);
    }
}
