//! Per-conversation live-chat state machine.
//!
//! One admin operates one conversation at a time over the shared channel.
//! Selecting a new conversation deactivates the previous one locally; the
//! server keeps the admin joined and is not told to leave.

use std::sync::{Arc, Mutex as StdMutex};

use shopfront_core::chat::{ChatMessage, ChatSession, Participant};
use shopfront_core::notice::{Notice, NoticeSender};
use shopfront_core::{ShopfrontError, ShopfrontResult};
use tracing::{debug, warn};

use crate::channel::{ConnectionState, NotificationChannel};
use crate::protocol::{ClientEvent, ServerEvent};

/// Conversation lifecycle as seen by the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No conversation selected.
    Idle,
    /// Join request sent, waiting for the server's history.
    Joining,
    /// Conversation open.
    Active,
}

struct SessionInner {
    state: SessionState,
    chat_id: Option<String>,
    messages: Vec<ChatMessage>,
    participant: Option<Participant>,
    sessions: Vec<ChatSession>,
}

/// Admin live-chat session layered on the notification channel.
pub struct LiveChatSession {
    channel: NotificationChannel,
    notices: NoticeSender,
    inner: StdMutex<SessionInner>,
}

impl LiveChatSession {
    pub fn new(channel: NotificationChannel, notices: NoticeSender) -> Self {
        Self {
            channel,
            notices,
            inner: StdMutex::new(SessionInner {
                state: SessionState::Idle,
                chat_id: None,
                messages: Vec::new(),
                participant: None,
                sessions: Vec::new(),
            }),
        }
    }

    /// Drain the channel's event stream into this session.
    pub async fn run(self: Arc<Self>) {
        let mut rx = self.channel.subscribe_events();
        loop {
            match rx.recv().await {
                Ok(event) => self.apply_event(&event),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Chat session lagged behind the event stream");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Join a conversation.
    ///
    /// Guarded: when the socket is down this surfaces an error and kicks off
    /// a reconnect instead of silently failing. The unassigned counter drops
    /// optimistically; authoritative session state still comes from the
    /// server.
    pub fn join_chat(&self, chat_id: &str) -> ShopfrontResult<()> {
        if self.channel.state() != ConnectionState::Connected {
            self.notify(Notice::error(
                "Live chat is reconnecting. Try again in a moment.",
            ));
            self.channel.connect();
            return Err(ShopfrontError::SocketClosed);
        }

        self.channel.send(&ClientEvent::JoinChat {
            chat_id: chat_id.to_string(),
        })?;

        let mut inner = self.lock();
        inner.state = SessionState::Joining;
        inner.chat_id = Some(chat_id.to_string());
        inner.messages.clear();
        inner.participant = None;
        if let Some(session) = inner.sessions.iter_mut().find(|s| s.chat_id == chat_id) {
            session.has_admin = true;
        }
        drop(inner);

        self.channel.decrement_live_chats();
        Ok(())
    }

    /// Send a message into the active conversation.
    ///
    /// Whitespace-only input is a no-op. The message is not appended locally;
    /// it echoes back as a `chat_message` event.
    pub fn send_message(&self, text: &str) -> ShopfrontResult<()> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(());
        }

        let chat_id = {
            let inner = self.lock();
            if inner.state != SessionState::Active {
                return Err(ShopfrontError::NoActiveChat);
            }
            match &inner.chat_id {
                Some(chat_id) => chat_id.clone(),
                None => return Err(ShopfrontError::NoActiveChat),
            }
        };

        let result = self.channel.send(&ClientEvent::Message {
            chat_id,
            content: content.to_string(),
        });
        if result.is_err() {
            self.notify(Notice::error("Message not sent. Live chat is offline."));
        }
        result
    }

    /// Request to end the active conversation. Removal from the session list
    /// happens only when the server confirms with `chat_ended`.
    pub fn end_chat(&self) -> ShopfrontResult<()> {
        let chat_id = {
            let inner = self.lock();
            match (&inner.state, &inner.chat_id) {
                (SessionState::Active, Some(chat_id)) => chat_id.clone(),
                _ => return Err(ShopfrontError::NoActiveChat),
            }
        };

        self.channel.send(&ClientEvent::EndChat { chat_id })
    }

    /// Fold one push event into the session state.
    pub fn apply_event(&self, event: &ServerEvent) {
        match event {
            ServerEvent::ActiveSessions { sessions } => {
                self.lock().sessions = sessions.clone();
            }
            ServerEvent::NewChat { session } => {
                let mut inner = self.lock();
                if let Some(existing) = inner
                    .sessions
                    .iter_mut()
                    .find(|s| s.chat_id == session.chat_id)
                {
                    *existing = session.clone();
                } else {
                    inner.sessions.push(session.clone());
                }
            }
            ServerEvent::ChatJoined {
                chat_id,
                user_name,
                user_phone,
                preferred_language,
                messages,
            } => {
                let mut inner = self.lock();
                if inner.chat_id.as_deref() != Some(chat_id.as_str()) {
                    debug!(chat_id = %chat_id, "Ignoring join confirmation for another chat");
                    return;
                }
                inner.state = SessionState::Active;
                inner.messages = messages.clone();
                inner.participant = Some(Participant {
                    user_name: user_name.clone(),
                    user_phone: user_phone.clone(),
                    preferred_language: preferred_language.clone(),
                });
            }
            ServerEvent::ChatMessage {
                chat_id,
                sender,
                content,
                sent_at,
            } => {
                let mut inner = self.lock();
                // Session-list metadata moves for every conversation, active
                // or not.
                if let Some(session) = inner.sessions.iter_mut().find(|s| &s.chat_id == chat_id) {
                    session.last_message_time = Some(*sent_at);
                    session.message_count += 1;
                }
                if inner.state == SessionState::Active
                    && inner.chat_id.as_deref() == Some(chat_id.as_str())
                {
                    inner.messages.push(ChatMessage {
                        chat_id: chat_id.clone(),
                        sender: *sender,
                        content: content.clone(),
                        sent_at: *sent_at,
                    });
                }
            }
            ServerEvent::ChatEnded { chat_id } => {
                let mut inner = self.lock();
                inner.sessions.retain(|s| &s.chat_id != chat_id);
                if inner.chat_id.as_deref() == Some(chat_id.as_str()) {
                    inner.state = SessionState::Idle;
                    inner.chat_id = None;
                    inner.messages.clear();
                    inner.participant = None;
                }
            }
            ServerEvent::ParticipantDisconnected { chat_id } => {
                let inner = self.lock();
                if inner.chat_id.as_deref() == Some(chat_id.as_str()) {
                    drop(inner);
                    self.notify(Notice::warning(
                        "The customer disconnected. You can keep typing or end the chat.",
                    ));
                }
            }
            // Counters and errors are handled by the channel itself.
            ServerEvent::ConnectionEstablished
            | ServerEvent::UnassignedMessage { .. }
            | ServerEvent::Error { .. }
            | ServerEvent::Unknown => {}
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn active_chat_id(&self) -> Option<String> {
        self.lock().chat_id.clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        self.lock().sessions.clone()
    }

    pub fn participant(&self) -> Option<Participant> {
        self.lock().participant.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeTransport;
    use chrono::Utc;
    use shopfront_core::chat::ChatSender;
    use shopfront_core::notice::create_notice_channel;
    use std::time::Duration;

    fn chat_session(chat_id: &str) -> ChatSession {
        ChatSession {
            chat_id: chat_id.into(),
            user_name: "Ada".into(),
            user_phone: None,
            preferred_language: Some("en".into()),
            has_admin: false,
            last_message_time: None,
            message_count: 0,
        }
    }

    async fn connected_fixture() -> (Arc<FakeTransport>, NotificationChannel, LiveChatSession) {
        let transport = Arc::new(FakeTransport::new(false));
        let channel = NotificationChannel::new(
            transport.clone(),
            "ws://test/ws".into(),
            create_notice_channel(),
        );
        channel.connect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let session = LiveChatSession::new(channel.clone(), create_notice_channel());
        (transport, channel, session)
    }

    #[tokio::test]
    async fn test_join_decrements_unassigned_counter() {
        let (transport, channel, session) = connected_fixture().await;

        transport.push_frame(
            r#"{"type":"new_chat","session":{"chatId":"c1","userName":"Ada","userPhone":null,"preferredLanguage":null,"hasAdmin":false,"lastMessageTime":null,"messageCount":0}}"#,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        let before = channel.counters_snapshot().unassigned_live_chats;
        assert_eq!(before, 1);

        session.join_chat("c1").expect("join");
        assert_eq!(channel.counters_snapshot().unassigned_live_chats, before - 1);
        assert_eq!(session.state(), SessionState::Joining);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let frames = transport.sent_frames();
        assert_eq!(frames, vec![r#"{"type":"join_chat","chatId":"c1"}"#.to_string()]);

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_join_requires_connected_socket() {
        let transport = Arc::new(FakeTransport::new(true));
        let channel = NotificationChannel::new(
            transport.clone(),
            "ws://test/ws".into(),
            create_notice_channel(),
        );
        let session = LiveChatSession::new(channel.clone(), create_notice_channel());

        let result = session.join_chat("c1");
        assert!(matches!(result, Err(ShopfrontError::SocketClosed)));
        assert_eq!(session.state(), SessionState::Idle);

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_chat_joined_activates_with_history() {
        let (_transport, channel, session) = connected_fixture().await;

        session.join_chat("c1").expect("join");
        session.apply_event(&ServerEvent::ChatJoined {
            chat_id: "c1".into(),
            user_name: "Ada".into(),
            user_phone: Some("+123".into()),
            preferred_language: Some("en".into()),
            messages: vec![ChatMessage {
                chat_id: "c1".into(),
                sender: ChatSender::Customer,
                content: "hi".into(),
                sent_at: Utc::now(),
            }],
        });

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.participant().map(|p| p.user_name), Some("Ada".into()));

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_message_routing_active_vs_inactive() {
        let (_transport, channel, session) = connected_fixture().await;

        session.apply_event(&ServerEvent::ActiveSessions {
            sessions: vec![chat_session("c1"), chat_session("c2")],
        });
        session.join_chat("c1").expect("join");
        session.apply_event(&ServerEvent::ChatJoined {
            chat_id: "c1".into(),
            user_name: "Ada".into(),
            user_phone: None,
            preferred_language: None,
            messages: vec![],
        });

        let now = Utc::now();
        // Active conversation: buffered and counted.
        session.apply_event(&ServerEvent::ChatMessage {
            chat_id: "c1".into(),
            sender: ChatSender::Customer,
            content: "hello".into(),
            sent_at: now,
        });
        // Inactive conversation: only the list metadata moves.
        session.apply_event(&ServerEvent::ChatMessage {
            chat_id: "c2".into(),
            sender: ChatSender::Customer,
            content: "anyone?".into(),
            sent_at: now,
        });

        assert_eq!(session.messages().len(), 1);
        let sessions = session.sessions();
        let c1 = sessions.iter().find(|s| s.chat_id == "c1").expect("c1");
        let c2 = sessions.iter().find(|s| s.chat_id == "c2").expect("c2");
        assert_eq!(c1.message_count, 1);
        assert_eq!(c2.message_count, 1);
        assert_eq!(c2.last_message_time, Some(now));

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_send_message_rules() {
        let (transport, channel, session) = connected_fixture().await;

        // Whitespace is a silent no-op.
        session.send_message("   ").expect("no-op");
        assert!(transport.sent_frames().is_empty());

        // Not active yet.
        assert!(matches!(
            session.send_message("hi"),
            Err(ShopfrontError::NoActiveChat)
        ));

        session.join_chat("c1").expect("join");
        session.apply_event(&ServerEvent::ChatJoined {
            chat_id: "c1".into(),
            user_name: "Ada".into(),
            user_phone: None,
            preferred_language: None,
            messages: vec![],
        });

        session.send_message("  hello there  ").expect("send");
        // No optimistic append; the echo comes back as chat_message.
        assert!(session.messages().is_empty());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(transport
            .sent_frames()
            .iter()
            .any(|f| f.contains(r#""content":"hello there""#)));

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_chat_ended_clears_active_conversation() {
        let (_transport, channel, session) = connected_fixture().await;

        session.apply_event(&ServerEvent::ActiveSessions {
            sessions: vec![chat_session("c1"), chat_session("c2")],
        });
        session.join_chat("c1").expect("join");
        session.apply_event(&ServerEvent::ChatJoined {
            chat_id: "c1".into(),
            user_name: "Ada".into(),
            user_phone: None,
            preferred_language: None,
            messages: vec![],
        });

        // Ending an inactive conversation only trims the list.
        session.apply_event(&ServerEvent::ChatEnded {
            chat_id: "c2".into(),
        });
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.sessions().len(), 1);

        // Ending the active one resets everything.
        session.apply_event(&ServerEvent::ChatEnded {
            chat_id: "c1".into(),
        });
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.active_chat_id().is_none());
        assert!(session.messages().is_empty());
        assert!(session.participant().is_none());

        channel.shutdown();
    }

    #[tokio::test]
    async fn test_end_chat_waits_for_server_confirmation() {
        let (transport, channel, session) = connected_fixture().await;

        session.apply_event(&ServerEvent::ActiveSessions {
            sessions: vec![chat_session("c1")],
        });
        session.join_chat("c1").expect("join");
        session.apply_event(&ServerEvent::ChatJoined {
            chat_id: "c1".into(),
            user_name: "Ada".into(),
            user_phone: None,
            preferred_language: None,
            messages: vec![],
        });

        session.end_chat().expect("end");
        // No local prediction: still active until chat_ended arrives.
        assert_eq!(session.state(), SessionState::Active);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(transport
            .sent_frames()
            .iter()
            .any(|f| f.contains(r#""type":"end_chat""#)));

        channel.shutdown();
    }
}
