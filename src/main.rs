use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use gemserve::config::Config;
use gemserve::logging;
use gemserve::resolver::FileResolver;
use gemserve::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    logging::init(&cfg.log_level)?;

    let acceptor = server::tls::load_tls_acceptor(&cfg.tls.cert_path, &cfg.tls.key_path)
        .context("Failed to load TLS certificate")?;
    let resolver = Arc::new(FileResolver::new(
        cfg.static_files.root.clone(),
        cfg.static_files.index.clone(),
    ));
    let listener = TcpListener::bind(cfg.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", cfg.listen_addr()))?;

    tracing::info!(root = %cfg.static_files.root.display(), "Serving static files");

    tokio::select! {
        res = server::listener::run(listener, acceptor, resolver, cfg.connection_settings()) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
