//! End-to-end tests of the WebSocket and SSE routers.
//!
//! Each test binds a router on an ephemeral port with a loader that builds an
//! in-process model, then talks to it with a real client.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use llm_repl::error::ReplError;
use llm_repl::llm::sse::{DONE_MARKER, StreamResponse};
use llm_repl::llm::{LanguageModel, ModelKind, ModelLoader};
use llm_repl::session::SessionRegistry;
use llm_repl::stream::TokenSink;
use llm_repl::transport::{ServerState, SseTiming, http, websocket};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

/// Steps of a `slow <tag>` reply, and the pause between them.
const SLOW_STEPS: usize = 20;
const SLOW_STEP: Duration = Duration::from_millis(50);

/// Answers "<n>:<message>" in two fragments; "boom" fails; "code" yields a
/// fenced block split across fragments; "slow <tag>" trickles ":<tag>:"
/// fragments for about a second; "pause" stays silent for a while before
/// answering.
struct Echo {
    turns: usize,
}

impl LanguageModel for Echo {
    fn name(&self) -> &str {
        "Echo"
    }

    fn info(&self) -> &str {
        "echoes the message back"
    }

    fn is_streaming(&self) -> bool {
        true
    }

    fn process<'a>(&'a mut self, message: &'a str, sink: &'a TokenSink) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.turns += 1;
            if let Some(tag) = message.strip_prefix("slow ") {
                for _ in 0..SLOW_STEPS {
                    sink.push_text(format!(":{tag}:"))?;
                    tokio::time::sleep(SLOW_STEP).await;
                }
                return Ok(());
            }
            match message {
                "pause" => {
                    tokio::time::sleep(Duration::from_millis(400)).await;
                    sink.push_text("done")?;
                }
                "boom" => anyhow::bail!("upstream exploded"),
                "code" => {
                    for fragment in ["```", "sh", "\nls\n", "```"] {
                        sink.push_text(fragment)?;
                    }
                }
                _ => {
                    sink.push_text(format!("{}:", self.turns))?;
                    sink.push_text(message)?;
                }
            }
            Ok(())
        })
    }
}

fn state(capacity: usize) -> ServerState {
    state_with_ping(capacity, Duration::from_secs(60))
}

fn state_with_ping(capacity: usize, ping_interval: Duration) -> ServerState {
    let loader: ModelLoader = Arc::new(|_kind: ModelKind| -> Result<Box<dyn LanguageModel>, ReplError> {
        Ok(Box::new(Echo { turns: 0 }))
    });
    ServerState::new(
        Arc::new(SessionRegistry::new(capacity)),
        loader,
        ModelKind::ChatGpt,
        SseTiming {
            ping_interval,
            retry: Duration::from_millis(1500),
        },
    )
}

async fn spawn(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Polls `check` until it holds or `limit` passes.
async fn eventually(limit: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

// --- SSE ---

/// Event names and decoded data of an SSE body, in order.
fn parse_events(body: &str) -> Vec<(String, String)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(value) = line.strip_prefix("event:") {
                    event = Some(value.trim_start().to_string());
                } else if let Some(value) = line.strip_prefix("data:") {
                    data = Some(value.trim_start().to_string());
                }
            }
            Some((event?, data?))
        })
        .collect()
}

fn content(data: &str) -> String {
    serde_json::from_str::<StreamResponse>(data)
        .unwrap()
        .into_content()
        .unwrap()
}

async fn post(
    addr: SocketAddr,
    client_id: Option<&str>,
    body: serde_json::Value,
) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(format!("http://{addr}{}", http::COMPLETIONS_PATH))
        .json(&body);
    if let Some(id) = client_id {
        request = request.header(http::CLIENT_ID_HEADER, id);
    }
    request.send().await.unwrap()
}

fn chat(message: &str) -> serde_json::Value {
    json!({ "model": "chatgpt", "messages": [{ "role": "user", "content": message }] })
}

#[tokio::test]
async fn test_sse_streams_messages_then_done() {
    let addr = spawn(http::router(state(8))).await;

    let response = post(addr, None, chat("hello")).await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(
        response.headers()[reqwest::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("retry:"));
    let events = parse_events(&body);

    assert!(events.iter().all(|(name, _)| name == http::MESSAGE_EVENT));
    let (_, last) = events.last().unwrap();
    assert_eq!(last, DONE_MARKER);
    let text: String = events[..events.len() - 1]
        .iter()
        .map(|(_, data)| content(data))
        .collect();
    assert_eq!(text, "1:hello");
}

#[tokio::test]
async fn test_sse_code_block_is_one_event() {
    let addr = spawn(http::router(state(8))).await;

    let body = post(addr, None, chat("code")).await.text().await.unwrap();
    let events = parse_events(&body);

    assert_eq!(events.len(), 2);
    assert_eq!(content(&events[0].1), "```sh\nls\n```");
}

#[tokio::test]
async fn test_sse_model_failure_is_error_event() {
    let addr = spawn(http::router(state(8))).await;

    let body = post(addr, None, chat("boom")).await.text().await.unwrap();
    let events = parse_events(&body);

    let (name, data) = &events[0];
    assert_eq!(name, http::ERROR_EVENT);
    assert!(data.contains("upstream exploded"));
    assert_eq!(events.last().unwrap().1, DONE_MARKER);
}

#[tokio::test]
async fn test_sse_client_id_continues_conversation() {
    let addr = spawn(http::router(state(8))).await;

    let first = post(addr, Some("alice"), chat("hi")).await.text().await.unwrap();
    let second = post(addr, Some("alice"), chat("again")).await.text().await.unwrap();
    let other = post(addr, Some("bob"), chat("hi")).await.text().await.unwrap();

    assert_eq!(content(&parse_events(&first)[0].1), "1:");
    assert_eq!(content(&parse_events(&second)[0].1), "2:");
    assert_eq!(content(&parse_events(&other)[0].1), "1:");
}

#[tokio::test]
async fn test_sse_unknown_model_is_404() {
    let addr = spawn(http::router(state(8))).await;

    let response = post(
        addr,
        None,
        json!({ "model": "llama", "messages": [{ "role": "user", "content": "hi" }] }),
    )
    .await;

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "model 'llama' not found");
}

#[tokio::test]
async fn test_sse_empty_messages_is_400() {
    let addr = spawn(http::router(state(8))).await;

    let response = post(addr, None, json!({ "messages": [] })).await;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sse_anonymous_sessions_are_not_kept() {
    let state = state(8);
    let registry = Arc::clone(&state.registry);
    let addr = spawn(http::router(state)).await;

    post(addr, None, chat("hi")).await.text().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(registry.is_empty());
}

/// Reads the body until `needle` shows up, then drops the response.
async fn read_until(mut response: reqwest::Response, needle: &str) {
    let mut seen = String::new();
    while !seen.contains(needle) {
        let chunk = tokio::time::timeout(Duration::from_secs(5), response.chunk())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        seen.push_str(&String::from_utf8_lossy(&chunk));
    }
}

#[tokio::test]
async fn test_sse_named_session_recovers_after_mid_turn_disconnect() {
    let addr = spawn(http::router(state(8))).await;

    read_until(post(addr, Some("alice"), chat("slow first")).await, ":first:").await;

    let body = post(addr, Some("alice"), chat("slow second"))
        .await
        .text()
        .await
        .unwrap();
    let events = parse_events(&body);

    assert_eq!(events.last().unwrap().1, DONE_MARKER);
    let text: String = events[..events.len() - 1]
        .iter()
        .map(|(_, data)| content(data))
        .collect();
    assert_eq!(text, ":second:".repeat(SLOW_STEPS));
}

#[tokio::test]
async fn test_sse_anonymous_session_removed_on_mid_turn_disconnect() {
    let state = state(8);
    let registry = Arc::clone(&state.registry);
    let addr = spawn(http::router(state)).await;

    let response = post(addr, None, chat("slow gone")).await;
    assert_eq!(registry.len(), 1);
    read_until(response, ":gone:").await;

    assert!(eventually(Duration::from_secs(2), || registry.is_empty()).await);
}

#[tokio::test]
async fn test_sse_sends_keep_alive_comments() {
    let addr = spawn(http::router(state_with_ping(8, Duration::from_millis(100)))).await;

    let body = post(addr, None, chat("pause")).await.text().await.unwrap();

    assert!(body.lines().any(|line| line.starts_with(':')));
    assert_eq!(parse_events(&body).last().unwrap().1, DONE_MARKER);
}

// --- WebSocket ---

async fn next_text<S>(ws: &mut S) -> String
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if msg.is_text() {
            return msg.to_text().unwrap().to_string();
        }
    }
}

#[tokio::test]
async fn test_websocket_turn_ends_with_eof() {
    let addr = spawn(websocket::router(state(8))).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();

    ws.send(Message::Text("hello".into())).await.unwrap();

    assert_eq!(next_text(&mut ws).await, "1:");
    assert_eq!(next_text(&mut ws).await, "hello");
    assert_eq!(next_text(&mut ws).await, websocket::END_OF_TURN);

    ws.send(Message::Text("code".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "```sh\nls\n```");
    assert_eq!(next_text(&mut ws).await, websocket::END_OF_TURN);
}

#[tokio::test]
async fn test_websocket_model_failure_keeps_connection() {
    let addr = spawn(websocket::router(state(8))).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    ws.send(Message::Text("boom".into())).await.unwrap();
    let frame = next_text(&mut ws).await;
    assert!(frame.starts_with(websocket::ERROR_PREFIX));
    assert!(frame.contains("upstream exploded"));
    assert_eq!(next_text(&mut ws).await, websocket::END_OF_TURN);

    ws.send(Message::Text("again".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "2:");
}

#[tokio::test]
async fn test_websocket_unknown_model_is_rejected() {
    let addr = spawn(websocket::router(state(8))).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/?model=llama"))
        .await
        .unwrap();

    assert_eq!(
        next_text(&mut ws).await,
        websocket::error_frame("model 'llama' not found")
    );
}

#[tokio::test]
async fn test_websocket_disconnect_removes_session() {
    let state = state(8);
    let registry = Arc::clone(&state.registry);
    let addr = spawn(websocket::router(state)).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();

    ws.send(Message::Text("hi".into())).await.unwrap();
    next_text(&mut ws).await;
    assert_eq!(registry.len(), 1);

    ws.close(None).await.unwrap();
    drop(ws);

    for _ in 0..50 {
        if registry.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session was not removed after disconnect");
}

#[tokio::test]
async fn test_websocket_close_mid_turn_removes_session_promptly() {
    let state = state(8);
    let registry = Arc::clone(&state.registry);
    let addr = spawn(websocket::router(state)).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();

    ws.send(Message::Text("slow bye".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, ":bye:");

    ws.close(None).await.unwrap();
    drop(ws);

    // Well before the turn would have finished on its own.
    let turn = SLOW_STEP * u32::try_from(SLOW_STEPS).unwrap();
    assert!(eventually(turn / 2, || registry.is_empty()).await);
}

#[tokio::test]
async fn test_websocket_closed_when_sessions_are_cleared() {
    let state = state(8);
    let registry = Arc::clone(&state.registry);
    let addr = spawn(websocket::router(state)).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/"))
        .await
        .unwrap();

    ws.send(Message::Text("hi".into())).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "1:");
    assert_eq!(next_text(&mut ws).await, "hi");
    assert_eq!(next_text(&mut ws).await, websocket::END_OF_TURN);

    registry.clear();

    let next = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap();
    assert!(matches!(next, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
}
