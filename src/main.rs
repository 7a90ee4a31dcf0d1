use anyhow::Result;
use clap::Parser;

use llm_repl::cli::commands::{http, models, personalities, terminal, websocket};
use llm_repl::cli::{Args, Command};
use llm_repl::error::ReplError;
use llm_repl::logging;
use llm_repl::ui::Style;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = match args.command {
        Some(Command::Websocket { .. } | Command::Http { .. }) => logging::SERVER_LEVEL,
        _ => logging::TERMINAL_LEVEL,
    };
    logging::init(level);

    if let Err(err) = run(args).await {
        eprintln!("{} {err:#}", Style::error("Error:"));
        std::process::exit(exit_code(&err));
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Command::Models) => models::print_models()?,
        Some(Command::Personalities) => personalities::list_personalities()?,
        Some(Command::Websocket { server }) => websocket::run_websocket(&args.model, &server).await?,
        Some(Command::Http { server }) => http::run_http(&args.model, &server).await?,
        Some(Command::Terminal) | None => terminal::run_terminal(&args.model).await?,
    }
    Ok(())
}

/// Configuration problems exit with `EX_CONFIG`, everything else with `EX_SOFTWARE`.
fn exit_code(err: &anyhow::Error) -> i32 {
    let is_config = err.chain().any(|cause| {
        cause.is::<toml::de::Error>()
            || cause.downcast_ref::<ReplError>().is_some_and(|e| {
                e.is_configuration() || matches!(e, ReplError::ModelNotFound(_))
            })
    });

    if is_config {
        exitcode::CONFIG
    } else {
        exitcode::SOFTWARE
    }
}
