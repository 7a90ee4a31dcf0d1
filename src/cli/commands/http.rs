use anyhow::Result;
use std::sync::Arc;

use crate::cli::{ModelArgs, ServerArgs};
use crate::config::ResolveOptions;
use crate::transport::{self, http};
use crate::ui::Style;

pub async fn run_http(model: &ModelArgs, server: &ServerArgs) -> Result<()> {
    let options = ResolveOptions {
        http_port: server.port,
        ..super::server_options(model, server)
    };
    let config = super::resolve(&options)?;
    let state = super::server_state(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.http_port);
    println!(
        "{} serving {} on {}",
        Style::header("llm-repl"),
        Style::value(config.model.display_name()),
        Style::value(format!("http://{addr}{}", http::COMPLETIONS_PATH))
    );

    let registry = Arc::clone(&state.registry);
    transport::serve(&addr, http::router(state), registry).await
}
