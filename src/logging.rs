//! Structured logging.
//!
//! The subscriber is built once in `main` from the configured level;
//! `RUST_LOG` wins when set. Connections log inside a span handed to them
//! by the listener (see [`connection_span`]).

use std::net::SocketAddr;

use tracing::Span;
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` if present and valid, else `default_level`.
pub fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Call once at startup.
pub fn init(default_level: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(false)
        .with_level(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

/// Span carrying the peer address for everything one connection logs.
pub fn connection_span(peer: SocketAddr) -> Span {
    tracing::info_span!("conn", %peer)
}
