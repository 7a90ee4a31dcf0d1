//! Front ends that connect users to sessions.
//!
//! Each transport decides how a client is identified, how rendered output is
//! framed, and how a disconnect is noticed. The network transports share a
//! [`ServerState`] holding the session registry and the model loader.

pub mod http;
pub mod terminal;
pub mod websocket;

use std::sync::Arc;
use std::time::Duration;

use crate::error::ReplError;
use crate::llm::{ModelKind, ModelLoader};
use crate::session::{ClientId, ClientSession, SessionRegistry};

/// Timing policy of the SSE transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SseTiming {
    /// Keep-alive comment interval.
    pub ping_interval: Duration,
    /// Reconnection delay advertised with every event.
    pub retry: Duration,
}

/// State shared by every connection of a server.
#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<SessionRegistry>,
    pub loader: ModelLoader,
    pub default_model: ModelKind,
    pub sse: SseTiming,
}

impl ServerState {
    pub fn new(
        registry: Arc<SessionRegistry>,
        loader: ModelLoader,
        default_model: ModelKind,
        sse: SseTiming,
    ) -> Self {
        Self {
            registry,
            loader,
            default_model,
            sse,
        }
    }

    /// Resolves a requested model name, falling back to the server default.
    pub fn resolve_model(&self, requested: Option<&str>) -> Result<ModelKind, ReplError> {
        match requested.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => ModelKind::from_name(name),
            None => Ok(self.default_model),
        }
    }

    /// Returns the session for `id`, loading a `kind` model if it is new.
    ///
    /// An existing session keeps the model it was created with.
    pub fn session_for(
        &self,
        id: &ClientId,
        kind: ModelKind,
    ) -> Result<Arc<ClientSession>, ReplError> {
        self.registry.get_or_create(id, || {
            let model = (self.loader)(kind)?;
            Ok(ClientSession::new(id.clone(), model))
        })
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("registry", &self.registry)
            .field("default_model", &self.default_model)
            .field("sse", &self.sse)
            .finish_non_exhaustive()
    }
}

/// Binds `addr` and serves `router` until the process is interrupted.
///
/// On shutdown every session in `registry` is closed, which ends open
/// WebSocket connections and SSE streams so the server can drain.
pub async fn serve(
    addr: &str,
    router: axum::Router,
    registry: Arc<SessionRegistry>,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener.local_addr().context("Failed to read bound address")?;
    tracing::info!(%local, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
            registry.clear();
        })
        .await
        .context("Server error")
}
