//! WebSocket transport.
//!
//! Every connection gets its own session. Inbound text frames are user
//! messages; outbound text frames are rendered output units. A turn ends with
//! an `EOF` frame and an error unit is sent as a frame prefixed `ERROR: `.
//! The model can be chosen per connection with `?model=<name>`.

use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinError;

use super::ServerState;
use crate::error::ReplError;
use crate::session::{ClientId, ClientSession};
use crate::stream::Output;

/// Frame sent after the last unit of a turn.
pub const END_OF_TURN: &str = "EOF";

/// Prefix of frames carrying an error unit.
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Query parameters accepted on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub model: Option<String>,
}

/// Builds the router serving WebSocket upgrades on `/` and `/ws`.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, params))
}

pub fn error_frame(message: &str) -> String {
    format!("{ERROR_PREFIX}{message}")
}

async fn handle_connection(mut socket: WebSocket, state: ServerState, params: ConnectParams) {
    let id = ClientId::generate();

    let session = match state
        .resolve_model(params.model.as_deref())
        .and_then(|kind| state.session_for(&id, kind))
    {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(client_id = %id, error = %err, "rejecting websocket client");
            let frame = Message::Text(error_frame(&err.to_string()).into());
            if socket.send(frame).await.is_err() || socket.send(Message::Close(None)).await.is_err() {
                tracing::debug!(client_id = %id, "client left before the error was delivered");
            }
            return;
        }
    };

    tracing::info!(client_id = %id, model = session.model_name(), "websocket client connected");

    let (sender, mut receiver) = socket.split();
    let mut drain = tokio::spawn(drain_to_socket(Arc::clone(&session), sender));
    let (inbound, queued) = mpsc::unbounded_channel();
    let mut submitter = tokio::spawn(submit_inbound(Arc::clone(&session), queued));

    // Turns run in their own task so a close frame is seen mid-turn.
    let outcome = loop {
        tokio::select! {
            result = &mut drain => break task_outcome(result),
            result = &mut submitter => break task_outcome(result),
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if inbound.send(text.as_str().to_owned()).is_err() {
                            break Ok(());
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Err(err)) => break Err(ReplError::Transport(err.to_string())),
                    // Binary, ping and pong frames are handled by axum
                    Some(Ok(_)) => {}
                }
            }
        }
    };

    drain.abort();
    submitter.abort();
    state.registry.remove(&id);

    match outcome {
        Ok(()) | Err(ReplError::SessionClosed(_)) => {
            tracing::info!(client_id = %id, "websocket client disconnected");
        }
        Err(err) => {
            tracing::warn!(client_id = %id, error = %err, "websocket connection failed");
        }
    }
}

fn task_outcome(result: Result<Result<(), ReplError>, JoinError>) -> Result<(), ReplError> {
    result.unwrap_or_else(|err| Err(ReplError::Transport(format!("connection task failed: {err}"))))
}

/// Submits inbound messages one turn at a time.
async fn submit_inbound(
    session: Arc<ClientSession>,
    mut queued: mpsc::UnboundedReceiver<String>,
) -> Result<(), ReplError> {
    while let Some(text) = queued.recv().await {
        session.submit(&text).await?;
    }
    Ok(())
}

/// Maps one rendered unit to the frame sent for it.
///
/// `in_turn` tracks whether a turn is open so that closing an idle session
/// does not produce a stray end-of-turn frame.
fn frame_for(output: Output, in_turn: &mut bool) -> Option<String> {
    match output {
        Output::TurnStart => {
            *in_turn = true;
            None
        }
        Output::Plain(text) | Output::Markdown(text) => Some(text),
        Output::Error(message) => Some(error_frame(&message)),
        Output::TurnEnd => std::mem::replace(in_turn, false).then(|| END_OF_TURN.to_string()),
    }
}

async fn drain_to_socket(
    session: Arc<ClientSession>,
    mut sender: SplitSink<WebSocket, Message>,
) -> Result<(), ReplError> {
    let mut in_turn = false;

    while let Some(outputs) = session.next_outputs().await {
        for output in outputs {
            let Some(frame) = frame_for(output, &mut in_turn) else {
                continue;
            };
            if let Err(err) = sender.send(Message::Text(frame.into())).await {
                session.close();
                return Err(ReplError::Transport(err.to_string()));
            }
        }
    }

    // The session was closed from elsewhere, e.g. evicted by the registry.
    if sender.send(Message::Close(None)).await.is_err() {
        tracing::debug!(client_id = %session.id(), "websocket already closed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(outputs: Vec<Output>) -> Vec<String> {
        let mut in_turn = false;
        outputs
            .into_iter()
            .filter_map(|o| frame_for(o, &mut in_turn))
            .collect()
    }

    #[test]
    fn test_turn_frames() {
        let got = frames(vec![
            Output::TurnStart,
            Output::Plain("Hi ".to_string()),
            Output::Markdown("```sh\nls\n```".to_string()),
            Output::TurnEnd,
        ]);
        assert_eq!(got, vec!["Hi ", "```sh\nls\n```", END_OF_TURN]);
    }

    #[test]
    fn test_error_frame_is_prefixed() {
        let got = frames(vec![
            Output::TurnStart,
            Output::Error("boom".to_string()),
            Output::TurnEnd,
        ]);
        assert_eq!(got, vec!["ERROR: boom", END_OF_TURN]);
    }

    #[test]
    fn test_end_outside_turn_sends_nothing() {
        assert!(frames(vec![Output::TurnEnd]).is_empty());
    }

    #[tokio::test]
    async fn test_failed_connection_task_is_a_transport_error() {
        let handle = tokio::spawn(std::future::pending::<Result<(), ReplError>>());
        handle.abort();

        let outcome = task_outcome(handle.await);

        assert!(matches!(outcome, Err(ReplError::Transport(msg)) if msg.contains("connection task failed")));
    }

    #[tokio::test]
    async fn test_finished_connection_task_keeps_its_result() {
        let handle = tokio::spawn(async { Err(ReplError::SessionClosed("c1".to_string())) });

        assert!(matches!(task_outcome(handle.await), Err(ReplError::SessionClosed(_))));
    }
}
