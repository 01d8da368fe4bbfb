//! Shopfront Realtime Layer
//!
//! One persistent WebSocket per admin session, folded into badge counters and
//! a per-conversation live-chat state machine. Counter population is a split
//! strategy: push for live-chat urgency, a 60-second poll for the rest.

pub mod channel;
pub mod poller;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use channel::{ConnectionState, NotificationChannel, RECONNECT_DELAY};
pub use poller::CounterPoller;
pub use session::{LiveChatSession, SessionState};
pub use transport::{SocketConnection, SocketTransport, WsTransport};
