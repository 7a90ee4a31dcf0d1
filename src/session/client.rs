use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::ReplError;
use crate::llm::LanguageModel;
use crate::stream::{Output, StreamRenderer, Token, TokenSink};

/// Identifies one connected client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(String);

impl ClientId {
    /// The identifier of the single terminal session.
    pub const TERMINAL: &'static str = "terminal";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier for a network client.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn terminal() -> Self {
        Self(Self::TERMINAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One conversation: a loaded model, the sink it writes to, and the renderer
/// that reads from it.
///
/// `submit` is the producer side and `next_outputs` the consumer side; they
/// are meant to run concurrently on the same session.
pub struct ClientSession {
    id: ClientId,
    model: Mutex<Box<dyn LanguageModel>>,
    sink: Arc<TokenSink>,
    renderer: Mutex<StreamRenderer>,
    output_claim: Arc<Mutex<()>>,
    streaming: bool,
    model_name: String,
    model_info: String,
}

impl ClientSession {
    pub fn new(id: ClientId, model: Box<dyn LanguageModel>) -> Self {
        let streaming = model.is_streaming();
        let model_name = model.name().to_string();
        let model_info = model.info().to_string();

        Self {
            id,
            model: Mutex::new(model),
            sink: Arc::new(TokenSink::new()),
            renderer: Mutex::new(StreamRenderer::new(streaming)),
            output_claim: Arc::new(Mutex::new(())),
            streaming,
            model_name,
            model_info,
        }
    }

    pub const fn id(&self) -> &ClientId {
        &self.id
    }

    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_info(&self) -> &str {
        &self.model_info
    }

    pub fn sink(&self) -> &TokenSink {
        &self.sink
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_closed()
    }

    /// Runs one turn of the conversation.
    ///
    /// Returns `Ok(false)` without touching the sink when `message` is blank.
    /// Turns are strictly ordered: a second call waits until the previous
    /// turn's output has been fully pulled from the sink. A model failure is
    /// reported in-band as [`Token::Error`] and does not end the session.
    pub async fn submit(&self, message: &str) -> Result<bool, ReplError> {
        let message = message.trim();
        if message.is_empty() {
            return Ok(false);
        }

        let mut model = self.model.lock().await;
        self.sink.wait_drained().await;

        if self.sink.is_closed() {
            return Err(ReplError::SessionClosed(self.id.to_string()));
        }

        self.sink.push(Token::Start)?;

        if let Err(err) = model.process(message, &self.sink).await {
            tracing::warn!(client_id = %self.id, error = %err, "model turn failed");
            self.sink.push(Token::Error(format!("{err:#}")))?;
        }

        self.sink.push(Token::End)?;
        Ok(true)
    }

    /// Pulls the next token and renders it.
    ///
    /// Returns `None` once the session is closed and its sink drained.
    pub async fn next_outputs(&self) -> Option<Vec<Output>> {
        let mut renderer = self.renderer.lock().await;
        let token = self.sink.pull().await?;
        Some(renderer.consume(token))
    }

    /// Waits for exclusive use of the output side.
    ///
    /// Request-scoped consumers hold the claim until they have seen the end of
    /// their turn, so a later consumer never receives an earlier turn's output.
    pub async fn claim_output(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.output_claim).lock_owned().await
    }

    /// Pulls and drops outputs up to the end of the current turn.
    pub async fn discard_turn(&self) {
        while let Some(outputs) = self.next_outputs().await {
            if outputs.contains(&Output::TurnEnd) {
                break;
            }
        }
    }

    /// Closes the sink, waking any consumer blocked in `next_outputs`.
    pub fn close(&self) {
        if !self.sink.is_closed() {
            tracing::debug!(client_id = %self.id, "closing session");
        }
        self.sink.close();
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("model", &self.model_name)
            .field("streaming", &self.streaming)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.sink.close();
    }
}
