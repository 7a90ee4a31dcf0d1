//! Subcommand implementations.

use anyhow::Result;
use std::sync::Arc;

use crate::cli::{ModelArgs, ServerArgs};
use crate::config::{ConfigFile, ConfigManager, ResolveOptions, ResolvedConfig, resolve_config};
use crate::llm;
use crate::session::SessionRegistry;
use crate::transport::{ServerState, SseTiming};

/// SSE server command handler.
pub mod http;

/// Model listing command handler.
pub mod models;

/// Personality listing command handler.
pub mod personalities;

/// Terminal REPL command handler.
pub mod terminal;

/// WebSocket server command handler.
pub mod websocket;

fn load_config_file() -> Result<ConfigFile> {
    ConfigManager::new()?.load_or_default()
}

/// CLI overrides shared by every front end.
fn base_options(model: &ModelArgs) -> ResolveOptions {
    ResolveOptions {
        model: model.model.clone(),
        personality: model.personality.clone(),
        endpoint: model.endpoint.clone(),
        no_stream: model.no_stream,
        ..ResolveOptions::default()
    }
}

/// CLI overrides of a server front end; `port` is applied by the caller.
fn server_options(model: &ModelArgs, server: &ServerArgs) -> ResolveOptions {
    ResolveOptions {
        host: server.host.clone(),
        capacity: server.capacity,
        ..base_options(model)
    }
}

fn resolve(options: &ResolveOptions) -> Result<ResolvedConfig> {
    let config_file = load_config_file()?;
    Ok(resolve_config(options, &config_file)?)
}

/// Builds the shared server state and checks that the default model loads.
fn server_state(config: &ResolvedConfig) -> Result<ServerState> {
    let loader = llm::loader(config.model_settings());
    loader(config.model)?;

    Ok(ServerState::new(
        Arc::new(SessionRegistry::new(config.capacity)),
        loader,
        config.model,
        SseTiming {
            ping_interval: config.server.sse_ping_interval,
            retry: config.server.sse_retry,
        },
    ))
}
