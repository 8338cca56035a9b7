use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{Instrument, debug, info, warn};

use crate::gemini::connection::{Connection, ConnectionSettings, Outcome};
use crate::logging::connection_span;
use crate::resolver::ContentResolver;

/// Accepts TLS connections forever, one task per connection.
///
/// A failing connection is logged and dropped; it never stops the loop.
pub async fn run<R>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    resolver: Arc<R>,
    settings: ConnectionSettings,
) -> anyhow::Result<()>
where
    R: ContentResolver,
{
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Accept failed");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let resolver = resolver.clone();
        let span = connection_span(peer);

        tokio::spawn(
            async move {
                debug!("Accepted connection");

                // The handshake shares the idle budget with the request line.
                let handshake = tokio::time::timeout(settings.idle_timeout, acceptor.accept(socket));
                let stream = match handshake.await {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(e)) => {
                        debug!(error = %e, "TLS handshake failed");
                        return;
                    }
                    Err(_) => {
                        debug!("TLS handshake timed out");
                        return;
                    }
                };

                let conn = Connection::new(stream, resolver, settings);
                match conn.run().await {
                    Ok(Outcome::Responded(status)) => debug!(status = status.code(), "Connection closed"),
                    Ok(outcome) => debug!(?outcome, "Connection closed without response"),
                    Err(e) => tracing::error!("Connection error: {:#}", e),
                }
            }
            .instrument(span),
        );
    }
}
