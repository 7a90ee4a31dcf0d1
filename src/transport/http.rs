//! Server-Sent Events transport with an OpenAI-style request shape.
//!
//! `POST /v1/chat/completions` takes `{model, messages}` and answers the last
//! message's content as a `text/event-stream`. Each rendered unit becomes a
//! `new_message` event whose data is a chat completion chunk; the stream ends
//! with a `[DONE]` event.
//!
//! A request may carry an `x-client-id` header to continue an existing
//! conversation. Without it, the session lives exactly as long as the
//! response stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OwnedMutexGuard;
use tokio::task::AbortHandle;

use super::ServerState;
use crate::error::ReplError;
use crate::llm::sse::{DONE_MARKER, StreamResponse};
use crate::session::{ClientId, ClientSession, SessionRegistry};
use crate::stream::Output;

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const MESSAGE_EVENT: &str = "new_message";
pub const MESSAGE_ID: &str = "message_id";
pub const ERROR_EVENT: &str = "error";

/// One chat message of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body of [`COMPLETIONS_PATH`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// The prompt: the content of the last message, if it is not blank.
    fn prompt(&self) -> Option<&str> {
        self.messages
            .last()
            .map(|m| m.content.trim())
            .filter(|content| !content.is_empty())
    }
}

/// Errors returned before the event stream starts.
#[derive(Debug)]
pub enum AppError {
    /// The request body is unusable.
    Validation(String),
    /// Session creation failed.
    Repl(ReplError),
}

impl From<ReplError> for AppError {
    fn from(e: ReplError) -> Self {
        Self::Repl(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Repl(e @ ReplError::ModelNotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            Self::Repl(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = json!({ "error": { "message": message } });

        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

/// Builds the router serving [`COMPLETIONS_PATH`].
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(COMPLETIONS_PATH, post(chat_completions))
        .with_state(state)
}

fn message_event(content: &str, retry: Duration) -> Event {
    let data = serde_json::to_value(StreamResponse::from_content(content))
        .unwrap_or_else(|_| json!({ "choices": [{ "delta": { "content": content } }] }));
    Event::default()
        .event(MESSAGE_EVENT)
        .id(MESSAGE_ID)
        .retry(retry)
        .data(data.to_string())
}

fn error_event(message: &str, retry: Duration) -> Event {
    let data = json!({ "error": { "message": message } });
    Event::default()
        .event(ERROR_EVENT)
        .id(MESSAGE_ID)
        .retry(retry)
        .data(data.to_string())
}

fn done_event(retry: Duration) -> Event {
    Event::default()
        .event(MESSAGE_EVENT)
        .id(MESSAGE_ID)
        .retry(retry)
        .data(DONE_MARKER)
}

/// Cleans up after a response stream, however it ends.
///
/// A generated-id session is removed from the registry. A named session is
/// kept, but if the client went away mid-turn the rest of that turn is
/// discarded so the next request starts on a clean turn boundary.
struct StreamGuard {
    session: Arc<ClientSession>,
    registry: Arc<SessionRegistry>,
    ephemeral: bool,
    finished: bool,
    submitter: AbortHandle,
    claim: Option<OwnedMutexGuard<()>>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let id = self.session.id();
        if self.ephemeral {
            self.submitter.abort();
            self.registry.remove(id);
            tracing::debug!(client_id = %id, "sse stream dropped, session removed");
            return;
        }

        if self.finished {
            return;
        }

        tracing::debug!(client_id = %id, "sse client left mid-turn, discarding the rest of the turn");
        let session = Arc::clone(&self.session);
        let claim = self.claim.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _claim = claim;
                    session.discard_turn().await;
                });
            }
            Err(_) => self.session.close(),
        }
    }
}

async fn chat_completions(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let prompt = request
        .prompt()
        .ok_or_else(|| {
            AppError::Validation("messages must end with a non-empty message".to_string())
        })?
        .to_string();
    let kind = state.resolve_model(request.model.as_deref())?;

    let named = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let (id, ephemeral) = match named {
        Some(name) => (ClientId::new(name), false),
        None => (ClientId::generate(), true),
    };

    let session = state.session_for(&id, kind).inspect_err(|err| {
        tracing::warn!(client_id = %id, error = %err, "failed to create sse session");
    })?;
    tracing::info!(client_id = %id, model = session.model_name(), "sse request");

    let claim = session.claim_output().await;

    let submitter = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(err) = session.submit(&prompt).await {
                tracing::debug!(client_id = %session.id(), error = %err, "sse submit ended early");
            }
        })
    };

    let mut guard = StreamGuard {
        session,
        registry: Arc::clone(&state.registry),
        ephemeral,
        finished: false,
        submitter: submitter.abort_handle(),
        claim: Some(claim),
    };
    let retry = state.sse.retry;

    let stream = async_stream::stream! {
        while let Some(outputs) = guard.session.next_outputs().await {
            for output in outputs {
                match output {
                    Output::TurnStart => {}
                    Output::Plain(text) | Output::Markdown(text) => {
                        yield Ok::<_, Infallible>(message_event(&text, retry));
                    }
                    Output::Error(message) => yield Ok(error_event(&message, retry)),
                    Output::TurnEnd => {
                        guard.finished = true;
                        guard.claim = None;
                        yield Ok(done_event(retry));
                        return;
                    }
                }
            }
        }
        guard.finished = true;
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.sse.ping_interval)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn request(messages: &[&str]) -> ChatRequest {
        ChatRequest {
            model: None,
            messages: messages
                .iter()
                .map(|c| ChatMessage {
                    role: "user".to_string(),
                    content: (*c).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_prompt_is_last_message() {
        assert_eq!(request(&["first", " second "]).prompt(), Some("second"));
    }

    #[test]
    fn test_prompt_rejects_empty_messages() {
        assert_eq!(request(&[]).prompt(), None);
        assert_eq!(request(&["hi", "   "]).prompt(), None);
    }

    #[test]
    fn test_request_model_is_optional() {
        let parsed: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert!(parsed.model.is_none());
        assert_eq!(parsed.prompt(), Some("hi"));
    }

    async fn error_body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_model_not_found_is_404() {
        let (status, body) =
            error_body(ReplError::ModelNotFound("llama".to_string()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "model 'llama' not found");
    }

    #[tokio::test]
    async fn test_configuration_failure_is_500() {
        let (status, body) =
            error_body(ReplError::MissingCredential("OPENAI_API_KEY".to_string()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("OPENAI_API_KEY")
        );
    }

    #[tokio::test]
    async fn test_validation_is_400() {
        let (status, _) = error_body(AppError::Validation("bad".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
