//! Tracing subscriber initialization.
//!
//! Logs go to stderr so they never mix with the terminal conversation on
//! stdout. `RUST_LOG` overrides the default level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter for the interactive terminal.
pub const TERMINAL_LEVEL: &str = "warn";

/// Default filter for the network servers.
pub const SERVER_LEVEL: &str = "info";

/// Builds the filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Installs the global subscriber.
///
/// Calling it a second time is harmless; the first subscriber stays active.
pub fn init(default_level: &str) {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
