use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ReplError;
use crate::llm::{ModelKind, ModelSettings};
use crate::paths;
use crate::personality::{self, DEFAULT_PERSONALITY, Personality};
use crate::session::DEFAULT_CAPACITY;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_WEBSOCKET_PORT: u16 = 8765;
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_SSE_PING_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_SSE_RETRY_MS: u64 = 15_000;

/// The `[repl]` section of config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplConfig {
    /// Default model kind (`chatgpt`, `chatgpt4`).
    pub model: Option<String>,
    /// Default personality: a preset, a `[personalities.*]` key, or a TOML path.
    pub personality: Option<String>,
    /// Maximum number of live sessions in server mode.
    pub capacity: Option<usize>,
    /// Request streamed completions.
    pub streaming: Option<bool>,
}

/// The `[provider]` section: where completions are requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API.
    pub endpoint: Option<String>,
    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,
}

/// The `[server]` section for the network transports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub websocket_port: Option<u16>,
    pub http_port: Option<u16>,
    pub sse_ping_interval_secs: Option<u64>,
    pub sse_retry_ms: Option<u64>,
}

/// The `[style]` section: colors of the terminal rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    pub client: Option<String>,
    pub server: Option<String>,
    pub error: Option<String>,
    pub misc: Option<String>,
}

/// The complete configuration file structure.
///
/// Corresponds to `~/.config/llm-repl/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub repl: ReplConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub style: StyleConfig,
    /// Custom personalities keyed by name.
    #[serde(default)]
    pub personalities: HashMap<String, Personality>,
}

/// Server settings after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub websocket_port: u16,
    pub http_port: u16,
    pub sse_ping_interval: Duration,
    pub sse_retry: Duration,
}

/// Rule colors after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSettings {
    pub client: String,
    pub server: String,
    pub error: String,
    pub misc: String,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            client: "green".to_string(),
            server: "blue".to_string(),
            error: "red".to_string(),
            misc: "bright black".to_string(),
        }
    }
}

/// Resolved configuration after merging CLI arguments and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub model: ModelKind,
    /// The name the personality was selected by.
    pub personality_name: String,
    pub personality: Personality,
    pub capacity: usize,
    pub streaming: bool,
    pub endpoint: String,
    pub api_key_env: String,
    pub server: ServerSettings,
    pub style: StyleSettings,
}

impl ResolvedConfig {
    /// Settings used to construct models for every session.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            endpoint: self.endpoint.clone(),
            api_key_env: self.api_key_env.clone(),
            personality: self.personality.clone(),
            streaming: self.streaming,
        }
    }
}

/// CLI overrides that take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub model: Option<String>,
    pub personality: Option<String>,
    pub endpoint: Option<String>,
    pub capacity: Option<usize>,
    pub host: Option<String>,
    pub websocket_port: Option<u16>,
    pub http_port: Option<u16>,
    /// `--no-stream` was given.
    pub no_stream: bool,
}

/// Resolves configuration by merging CLI options with config file settings.
///
/// CLI options take precedence over config file values, which take
/// precedence over built-in defaults.
///
/// # Errors
///
/// Fails with [`ReplError::ModelNotFound`] for an unknown model and with
/// [`ReplError::Configuration`] for an unknown personality or a zero capacity.
pub fn resolve_config(
    options: &ResolveOptions,
    config_file: &ConfigFile,
) -> Result<ResolvedConfig, ReplError> {
    let model_name = options
        .model
        .as_deref()
        .or(config_file.repl.model.as_deref())
        .unwrap_or(ModelKind::ChatGpt.key());
    let model = ModelKind::from_name(model_name)?;

    let personality_name = options
        .personality
        .as_deref()
        .or(config_file.repl.personality.as_deref())
        .unwrap_or(DEFAULT_PERSONALITY)
        .to_string();
    let personality =
        personality::resolve_personality(&personality_name, &config_file.personalities)?;

    let capacity = options
        .capacity
        .or(config_file.repl.capacity)
        .unwrap_or(DEFAULT_CAPACITY);
    if capacity == 0 {
        return Err(ReplError::Configuration(
            "capacity must be at least 1".to_string(),
        ));
    }

    let streaming = !options.no_stream && config_file.repl.streaming.unwrap_or(true);

    let endpoint = options
        .endpoint
        .as_ref()
        .or(config_file.provider.endpoint.as_ref())
        .cloned()
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let api_key_env = config_file
        .provider
        .api_key_env
        .clone()
        .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());

    let server_file = &config_file.server;
    let server = ServerSettings {
        host: options
            .host
            .as_ref()
            .or(server_file.host.as_ref())
            .cloned()
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        websocket_port: options
            .websocket_port
            .or(server_file.websocket_port)
            .unwrap_or(DEFAULT_WEBSOCKET_PORT),
        http_port: options
            .http_port
            .or(server_file.http_port)
            .unwrap_or(DEFAULT_HTTP_PORT),
        sse_ping_interval: Duration::from_secs(
            server_file
                .sse_ping_interval_secs
                .unwrap_or(DEFAULT_SSE_PING_INTERVAL_SECS)
                .max(1),
        ),
        sse_retry: Duration::from_millis(server_file.sse_retry_ms.unwrap_or(DEFAULT_SSE_RETRY_MS)),
    };

    let defaults = StyleSettings::default();
    let style_file = &config_file.style;
    let style = StyleSettings {
        client: style_file.client.clone().unwrap_or(defaults.client),
        server: style_file.server.clone().unwrap_or(defaults.server),
        error: style_file.error.clone().unwrap_or(defaults.error),
        misc: style_file.misc.clone().unwrap_or(defaults.misc),
    };

    Ok(ResolvedConfig {
        model,
        personality_name,
        personality,
        capacity,
        streaming,
        endpoint,
        api_key_env,
        server,
        style,
    })
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a config manager for the default location.
    ///
    /// Configuration is stored at `$XDG_CONFIG_HOME/llm-repl/config.toml`
    /// or `~/.config/llm-repl/config.toml` if `XDG_CONFIG_HOME` is not set.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: paths::config_file()?,
        })
    }

    /// Creates a config manager for an explicit file.
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub const fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load(&self) -> Result<ConfigFile> {
        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config_file: ConfigFile = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })?;

        Ok(config_file)
    }

    /// Loads the config file, treating a missing file as all defaults.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(&self) -> Result<ConfigFile> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(ConfigFile::default());
        }
        self.load()
    }
}
