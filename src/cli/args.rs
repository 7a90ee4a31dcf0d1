use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "llm-repl")]
#[command(about = "Chat with language models from the terminal, a WebSocket or an SSE endpoint")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by every front end.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Model to load (chatgpt, chatgpt4)
    #[arg(short = 'm', long, global = true)]
    pub model: Option<String>,

    /// Personality: a preset, a [personalities.*] key, or a path to a .toml file
    #[arg(short = 'p', long, global = true)]
    pub personality: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(short = 'e', long, global = true)]
    pub endpoint: Option<String>,

    /// Request whole responses instead of streamed ones
    #[arg(long, global = true)]
    pub no_stream: bool,
}

/// Options of the network servers.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Maximum number of live sessions
    #[arg(long)]
    pub capacity: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive terminal chat (default)
    Terminal,
    /// Serve sessions over WebSocket
    Websocket {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// Serve sessions over HTTP Server-Sent Events
    Http {
        #[command(flatten)]
        server: ServerArgs,
    },
    /// List available models
    Models,
    /// List available personalities
    Personalities,
}
