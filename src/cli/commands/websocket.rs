use anyhow::Result;
use std::sync::Arc;

use crate::cli::{ModelArgs, ServerArgs};
use crate::config::ResolveOptions;
use crate::transport::{self, websocket};
use crate::ui::Style;

pub async fn run_websocket(model: &ModelArgs, server: &ServerArgs) -> Result<()> {
    let options = ResolveOptions {
        websocket_port: server.port,
        ..super::server_options(model, server)
    };
    let config = super::resolve(&options)?;
    let state = super::server_state(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.websocket_port);
    println!(
        "{} serving {} on {}",
        Style::header("llm-repl"),
        Style::value(config.model.display_name()),
        Style::value(format!("ws://{addr}"))
    );

    let registry = Arc::clone(&state.registry);
    transport::serve(&addr, websocket::router(state), registry).await
}
