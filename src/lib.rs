//! # llm-repl - Chat with language models over several front ends
//!
//! `llm-repl` connects users to OpenAI-compatible chat models through an
//! interactive terminal, a WebSocket server or an HTTP Server-Sent Events
//! endpoint. Every client gets its own session with its own model and
//! conversation history; streamed responses are rendered incrementally, with
//! fenced code blocks held back until they are complete.
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//!
//! # Interactive terminal
//! llm-repl
//!
//! # WebSocket server on ws://127.0.0.1:8765
//! llm-repl websocket
//!
//! # SSE server on http://127.0.0.1:8000/v1/chat/completions
//! llm-repl http --model chatgpt4
//! ```
//!
//! ## Configuration
//!
//! Settings are read from `~/.config/llm-repl/config.toml`:
//!
//! ```toml
//! [repl]
//! model = "chatgpt4"
//! personality = "pirate"
//!
//! [personalities.pirate]
//! description = "Talks like a pirate"
//! personality = "You are a pirate."
//! memory = ["The user likes parrots."]
//! ```

/// Command-line interface definitions and handlers.
pub mod cli;

/// Configuration file management and resolution.
pub mod config;

/// Domain error type.
pub mod error;

/// Language-model handles and the chat completions client.
pub mod llm;

/// Tracing subscriber setup.
pub mod logging;

/// XDG-style configuration paths.
pub mod paths;

/// Personalities (system prompts and memory seeds).
pub mod personality;

/// Client sessions and the LRU session registry.
pub mod session;

/// Token sink and incremental renderer.
pub mod stream;

/// Terminal, WebSocket and SSE front ends.
pub mod transport;

/// Terminal UI components (spinner, colors, rules).
pub mod ui;
