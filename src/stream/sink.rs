//! Single-consumer token queue between a model and a transport.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex, Notify, mpsc};

use crate::error::ReplError;

/// One item travelling from the model to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opens a model response.
    Start,
    /// A content fragment.
    Text(String),
    /// The turn failed; carries a user-facing message.
    Error(String),
    /// Closes a model response.
    End,
}

impl Token {
    /// Convenience constructor for a content fragment.
    pub fn text(fragment: impl Into<String>) -> Self {
        Self::Text(fragment.into())
    }
}

/// An unbounded FIFO of [`Token`]s with exactly one consumer.
///
/// `push` never blocks, so it is safe to call from inside a model's streaming
/// loop. `pull` suspends until a token is available and returns `None` once
/// the sink has been closed and drained.
#[derive(Debug)]
pub struct TokenSink {
    tx: mpsc::UnboundedSender<Token>,
    rx: Mutex<mpsc::UnboundedReceiver<Token>>,
    closed: AtomicBool,
    pending: AtomicUsize,
    drained: Notify,
}

impl Default for TokenSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSink {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            closed: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Appends a token to the tail of the queue.
    ///
    /// Fails with [`ReplError::StreamCorruption`] once the sink is closed.
    pub fn push(&self, token: Token) -> Result<(), ReplError> {
        if self.is_closed() {
            return Err(ReplError::StreamCorruption(format!(
                "{token:?} pushed after the sink was closed"
            )));
        }
        self.send(token)
    }

    /// Appends a content fragment.
    pub fn push_text(&self, fragment: impl Into<String>) -> Result<(), ReplError> {
        self.push(Token::Text(fragment.into()))
    }

    /// Removes and returns the head of the queue, waiting if it is empty.
    pub async fn pull(&self) -> Option<Token> {
        let mut rx = self.rx.lock().await;

        let token = if self.is_closed() {
            rx.try_recv().ok()?
        } else {
            // The sink owns a sender, so `recv` only wakes on a real token.
            // `close` always sends a final `End`, which unblocks this await.
            rx.recv().await?
        };

        self.mark_pulled();
        Some(token)
    }

    /// Pushes a final [`Token::End`] and rejects further pushes.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.send(Token::End).is_err() {
            tracing::debug!("token receiver already gone while closing sink");
        }
        // Anyone waiting for a drain must not wait on a dead sink.
        self.drained.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of tokens pushed but not yet pulled.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Waits until every pushed token has been pulled, or the sink is closed.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 || self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    fn send(&self, token: Token) -> Result<(), ReplError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(token).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            ReplError::StreamCorruption("token receiver dropped".to_string())
        })
    }

    fn mark_pulled(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}
