//! Configuration file loading and CLI/file/default resolution.

mod manager;

pub use manager::{
    ConfigFile, ConfigManager, DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_HOST,
    DEFAULT_HTTP_PORT, DEFAULT_SSE_PING_INTERVAL_SECS, DEFAULT_SSE_RETRY_MS,
    DEFAULT_WEBSOCKET_PORT, ProviderConfig, ReplConfig, ResolveOptions, ResolvedConfig,
    ServerConfig, ServerSettings, StyleConfig, StyleSettings, resolve_config,
};
