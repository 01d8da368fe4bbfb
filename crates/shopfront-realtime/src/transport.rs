//! Socket transport seam.
//!
//! The channel logic is written against these traits so tests can drive it
//! with an in-memory transport; production uses tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shopfront_core::{ShopfrontError, ShopfrontResult};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Opens socket connections.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self, url: &str) -> ShopfrontResult<Box<dyn SocketConnection>>;
}

/// One open socket connection.
#[async_trait]
pub trait SocketConnection: Send {
    /// Send a text frame.
    async fn send(&mut self, text: String) -> ShopfrontResult<()>;

    /// Next inbound text frame. `None` means the peer closed the connection.
    async fn next_text(&mut self) -> Option<ShopfrontResult<String>>;

    /// Close deliberately.
    async fn close(&mut self);
}

/// Production transport over tokio-tungstenite.
pub struct WsTransport;

#[async_trait]
impl SocketTransport for WsTransport {
    async fn connect(&self, url: &str) -> ShopfrontResult<Box<dyn SocketConnection>> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(ws_err)?;
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl SocketConnection for WsConnection {
    async fn send(&mut self, text: String) -> ShopfrontResult<()> {
        self.stream.send(Message::Text(text)).await.map_err(ws_err)
    }

    async fn next_text(&mut self) -> Option<ShopfrontResult<String>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Ping/pong are handled by tungstenite; binary is not part of
                // the protocol.
                Ok(_) => continue,
                Err(e) => return Some(Err(ws_err(e))),
            }
        }
        None
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

fn ws_err(err: tokio_tungstenite::tungstenite::Error) -> ShopfrontError {
    ShopfrontError::Socket(err.to_string())
}
