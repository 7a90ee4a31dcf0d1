use anyhow::{Context, Result};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::prompt::build_system_prompt;
use super::sse::sse_to_text_stream;
use super::{LanguageModel, ModelKind};
use crate::personality::Personality;
use crate::stream::TokenSink;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn into_content(self) -> String {
        self.choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect()
    }
}

/// A conversation with an OpenAI-compatible chat completions endpoint.
///
/// The model keeps the running history of its conversation and replays it
/// with every request.
pub struct ChatModel {
    kind: ModelKind,
    client: Client,
    endpoint: String,
    api_key: String,
    system_prompt: String,
    streaming: bool,
    history: Vec<Message<'static>>,
}

impl ChatModel {
    pub fn new(
        kind: ModelKind,
        endpoint: String,
        api_key: String,
        personality: &Personality,
        streaming: bool,
    ) -> Self {
        Self {
            kind,
            client: Client::new(),
            endpoint,
            api_key,
            system_prompt: build_system_prompt(personality),
            streaming,
            history: Vec::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.endpoint.trim_end_matches('/')
        )
    }

    fn build_request<'a>(&'a self, message: &'a str) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message {
            role: "system",
            content: Cow::Borrowed(&self.system_prompt),
        });
        messages.extend(self.history.iter().map(|m| Message {
            role: m.role,
            content: Cow::Borrowed(m.content.as_ref()),
        }));
        messages.push(Message {
            role: "user",
            content: Cow::Borrowed(message),
        });

        ChatCompletionRequest {
            model: self.kind.model_id(),
            messages,
            stream: self.streaming,
        }
    }

    async fn send(&self, message: &str) -> Result<reqwest::Response> {
        let url = self.completions_url();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(message))
            .send()
            .await
            .with_context(|| format!("Failed to connect to API endpoint: {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API request failed with status {status}: {body}");
        }

        Ok(response)
    }

    async fn run(&mut self, message: &str, sink: &TokenSink) -> Result<()> {
        let response = self.send(message).await?;

        let reply = if self.streaming {
            let mut stream = std::pin::pin!(sse_to_text_stream(response.bytes_stream()));
            let mut reply = String::new();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                reply.push_str(&chunk);
                sink.push_text(chunk)?;
            }
            reply
        } else {
            let body: CompletionResponse = response
                .json()
                .await
                .context("Failed to decode completion response")?;
            let reply = body.into_content().trim().to_string();
            sink.push_text(reply.clone())?;
            reply
        };

        tracing::debug!(
            model = self.kind.model_id(),
            reply_len = reply.len(),
            "completion finished"
        );

        self.history.push(Message {
            role: "user",
            content: Cow::Owned(message.to_string()),
        });
        self.history.push(Message {
            role: "assistant",
            content: Cow::Owned(reply),
        });
        Ok(())
    }
}

impl LanguageModel for ChatModel {
    fn name(&self) -> &str {
        self.kind.display_name()
    }

    fn info(&self) -> &str {
        self.kind.info()
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn process<'a>(
        &'a mut self,
        message: &'a str,
        sink: &'a TokenSink,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.run(message, sink))
    }
}
