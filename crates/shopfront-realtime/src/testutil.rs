//! In-memory socket transport for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use shopfront_core::{ShopfrontError, ShopfrontResult};
use tokio::sync::mpsc;

use crate::transport::{SocketConnection, SocketTransport};

/// Scriptable transport: the test pushes inbound frames and inspects what the
/// channel sent. Dropping the server handles closes the connection.
pub(crate) struct FakeTransport {
    fail_connect: bool,
    attempts: AtomicUsize,
    sent: Arc<StdMutex<Vec<String>>>,
    server_handles: StdMutex<Vec<mpsc::UnboundedSender<String>>>,
}

impl FakeTransport {
    pub(crate) fn new(fail_connect: bool) -> Self {
        Self {
            fail_connect,
            attempts: AtomicUsize::new(0),
            sent: Arc::new(StdMutex::new(Vec::new())),
            server_handles: StdMutex::new(Vec::new()),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Deliver an inbound frame on every open connection.
    pub(crate) fn push_frame(&self, json: &str) {
        for handle in self.server_handles.lock().unwrap().iter() {
            let _ = handle.send(json.to_string());
        }
    }

    /// Frames the channel sent, in order.
    pub(crate) fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Close every open connection from the server side.
    pub(crate) fn close_all(&self) {
        self.server_handles.lock().unwrap().clear();
    }
}

#[async_trait]
impl SocketTransport for FakeTransport {
    async fn connect(&self, _url: &str) -> ShopfrontResult<Box<dyn SocketConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(ShopfrontError::Socket("connection refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.server_handles.lock().unwrap().push(tx);
        Ok(Box::new(FakeConnection {
            rx,
            sent: Arc::clone(&self.sent),
        }))
    }
}

struct FakeConnection {
    rx: mpsc::UnboundedReceiver<String>,
    sent: Arc<StdMutex<Vec<String>>>,
}

#[async_trait]
impl SocketConnection for FakeConnection {
    async fn send(&mut self, text: String) -> ShopfrontResult<()> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<ShopfrontResult<String>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
