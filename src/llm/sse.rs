//! Server-Sent Events framing for OpenAI-compatible chat completion streams.
//!
//! The same delta payload is decoded by the model client and encoded by the
//! HTTP transport, so both directions share these types.

use anyhow::Result;
use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

/// Data payload of the terminal event.
pub const DONE_MARKER: &str = "[DONE]";

/// One streamed chat completion chunk: `{"choices":[{"delta":{"content":...}}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamResponse {
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChoice {
    pub delta: Delta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamResponse {
    /// Builds a single-choice chunk carrying `content`.
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![StreamChoice {
                delta: Delta {
                    content: Some(content.into()),
                },
            }],
        }
    }

    /// Concatenates the non-empty content of every choice.
    pub fn into_content(self) -> Option<String> {
        let content: String = self
            .choices
            .into_iter()
            .filter_map(|c| c.delta.content)
            .filter(|c| !c.is_empty())
            .collect();

        if content.is_empty() {
            None
        } else {
            Some(content)
        }
    }
}

/// Classification of one line of an SSE body.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Content(String),
    Done,
    Ignored,
}

/// Converts a raw SSE byte stream into a stream of text chunks.
///
/// Lines may be split across network chunks; the stream ends at `data: [DONE]`.
pub fn sse_to_text_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> impl Stream<Item = Result<String>> + Send {
    async_stream::stream! {
        use futures_util::StreamExt;

        let mut byte_stream = std::pin::pin!(byte_stream);
        // Raw bytes: a chunk may end inside a multi-byte character.
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(anyhow::anyhow!("Stream error: {e}"));
                    return;
                }
            };

            buffer.extend_from_slice(&chunk);

            while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = match String::from_utf8(raw) {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(anyhow::anyhow!("Stream error: invalid UTF-8 in SSE line: {e}"));
                        return;
                    }
                };

                match parse_sse_line(line.trim()) {
                    SseLine::Content(content) => yield Ok(content),
                    SseLine::Done => return,
                    SseLine::Ignored => {}
                }
            }
        }
    }
}

/// Parses a single trimmed SSE line such as `data: {"choices":[...]}`.
fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line
        .strip_prefix("data:")
        .map(str::trim_start)
    else {
        return SseLine::Ignored;
    };

    if data == DONE_MARKER {
        return SseLine::Done;
    }

    serde_json::from_str::<StreamResponse>(data)
        .ok()
        .and_then(StreamResponse::into_content)
        .map_or(SseLine::Ignored, SseLine::Content)
}
