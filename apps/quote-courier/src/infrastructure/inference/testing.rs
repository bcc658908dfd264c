//! Scripted duplex transport for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{DuplexConnection, DuplexConnector, TransportError};

use super::messages::ResponseFrame;

/// One scripted inbound event.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver a raw text message.
    Text(String),
    /// The peer closes the connection.
    Close,
    /// The read fails.
    Fail(String),
    /// Nothing ever arrives.
    Hang,
}

impl Step {
    pub fn frame(frame: &ResponseFrame) -> Self {
        Self::Text(serde_json::to_string(frame).unwrap())
    }
}

type Queue = Arc<Mutex<VecDeque<Step>>>;

#[derive(Debug, Default)]
struct Shared {
    last_queue: Mutex<Option<Queue>>,
    sent: Mutex<Vec<String>>,
    last_url: Mutex<Option<String>>,
    closed: AtomicBool,
    opened: AtomicUsize,
}

/// Replays the same script on every opened connection, each with its own
/// copy of the script.
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    script: Vec<Step>,
    shared: Arc<Shared>,
    open_delay: Duration,
    fail_open: bool,
    fail_send: bool,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            shared: Arc::default(),
            open_delay: Duration::ZERO,
            fail_open: false,
            fail_send: false,
        }
    }

    pub const fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub const fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub const fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().clone()
    }

    pub fn last_url(&self) -> Option<String> {
        self.shared.last_url.lock().clone()
    }

    /// Unread steps of the most recently opened connection.
    pub fn remaining_steps(&self) -> usize {
        self.shared
            .last_queue
            .lock()
            .as_ref()
            .map_or(0, |queue| queue.lock().len())
    }
}

#[async_trait]
impl DuplexConnector for ScriptedConnector {
    async fn open(&self, url: &str) -> Result<Box<dyn DuplexConnection>, TransportError> {
        *self.shared.last_url.lock() = Some(url.to_string());
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        if self.fail_open {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared.closed.store(false, Ordering::SeqCst);
        let queue: Queue = Arc::new(Mutex::new(self.script.iter().cloned().collect()));
        *self.shared.last_queue.lock() = Some(Arc::clone(&queue));

        Ok(Box::new(ScriptedConnection {
            shared: Arc::clone(&self.shared),
            queue,
            fail_send: self.fail_send,
            peer_closed: false,
        }))
    }
}

struct ScriptedConnection {
    shared: Arc<Shared>,
    queue: Queue,
    fail_send: bool,
    peer_closed: bool,
}

#[async_trait]
impl DuplexConnection for ScriptedConnection {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::Send("broken pipe".to_string()));
        }
        self.shared.sent.lock().push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        if self.peer_closed {
            return None;
        }
        let step = self.queue.lock().pop_front();
        match step {
            Some(Step::Text(text)) => Some(Ok(text)),
            Some(Step::Fail(reason)) => Some(Err(TransportError::Receive(reason))),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Close) | None => {
                self.peer_closed = true;
                None
            }
        }
    }

    async fn close(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }
}
