//! Language-model handles.
//!
//! Models are named by the closed [`ModelKind`] enum; each kind maps to a
//! constructor at compile time. A loaded model implements [`LanguageModel`]
//! and delivers its response through a [`TokenSink`].

mod client;
mod prompt;
pub mod sse;

use anyhow::Result;
use futures_util::future::BoxFuture;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use client::ChatModel;
pub use prompt::build_system_prompt;

use crate::error::ReplError;
use crate::personality::Personality;
use crate::stream::TokenSink;

/// A loaded model that can answer messages.
pub trait LanguageModel: Send {
    /// Display name, e.g. `ChatGPT-4`.
    fn name(&self) -> &str;

    /// One-line description of the model.
    fn info(&self) -> &str;

    /// Whether fragments are pushed as they are generated (`true`) or as a
    /// single fragment once the whole reply is known (`false`).
    fn is_streaming(&self) -> bool;

    /// Answers `message`, pushing content fragments to `sink`.
    ///
    /// Implementations push only [`crate::stream::Token::Text`]; turn
    /// boundaries are owned by the session.
    fn process<'a>(&'a mut self, message: &'a str, sink: &'a TokenSink)
    -> BoxFuture<'a, Result<()>>;
}

/// Settings needed to load any model kind.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Base URL of the OpenAI-compatible API.
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Personality the model is loaded with.
    pub personality: Personality,
    /// Request streamed completions.
    pub streaming: bool,
}

/// Builds a fresh model for a kind. Shared by every transport.
pub type ModelLoader =
    Arc<dyn Fn(ModelKind) -> Result<Box<dyn LanguageModel>, ReplError> + Send + Sync>;

/// Returns a loader that constructs models from `settings`.
pub fn loader(settings: ModelSettings) -> ModelLoader {
    Arc::new(move |kind| kind.load(&settings))
}

type Constructor = fn(ModelKind, &ModelSettings) -> Result<Box<dyn LanguageModel>, ReplError>;

/// The models this crate knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    ChatGpt,
    ChatGpt4,
}

impl ModelKind {
    pub const ALL: &'static [Self] = &[Self::ChatGpt, Self::ChatGpt4];

    /// Short name used on the command line and in config.toml.
    pub const fn key(self) -> &'static str {
        match self {
            Self::ChatGpt => "chatgpt",
            Self::ChatGpt4 => "chatgpt4",
        }
    }

    /// Model identifier sent to the API.
    pub const fn model_id(self) -> &'static str {
        match self {
            Self::ChatGpt => "gpt-3.5-turbo",
            Self::ChatGpt4 => "gpt-4",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::ChatGpt4 => "ChatGPT-4",
        }
    }

    pub const fn info(self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT based on OpenAI's GPT-3.5 Turbo model.",
            Self::ChatGpt4 => "ChatGPT based on OpenAI's GPT-4 model.",
        }
    }

    /// Resolves a short name or an API model id.
    pub fn from_name(name: &str) -> Result<Self, ReplError> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.key().eq_ignore_ascii_case(name) || kind.model_id() == name)
            .ok_or_else(|| ReplError::ModelNotFound(name.to_string()))
    }

    const fn constructor(self) -> Constructor {
        match self {
            Self::ChatGpt | Self::ChatGpt4 => load_chat_model,
        }
    }

    /// Loads a model of this kind.
    ///
    /// Fails with [`ReplError::MissingCredential`] when the API key is not set.
    pub fn load(self, settings: &ModelSettings) -> Result<Box<dyn LanguageModel>, ReplError> {
        let model = (self.constructor())(self, settings)?;
        tracing::info!(model = self.key(), streaming = model.is_streaming(), "model loaded");
        Ok(model)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModelKind {
    type Err = ReplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

fn load_chat_model(
    kind: ModelKind,
    settings: &ModelSettings,
) -> Result<Box<dyn LanguageModel>, ReplError> {
    let api_key = std::env::var(&settings.api_key_env)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ReplError::MissingCredential(settings.api_key_env.clone()))?;

    Ok(Box::new(ChatModel::new(
        kind,
        settings.endpoint.clone(),
        api_key,
        &settings.personality,
        settings.streaming,
    )))
}
