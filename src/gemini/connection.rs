use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::gemini::response::{Response, Status};
use crate::gemini::session::{IdleTimer, Session, Step};
use crate::gemini::writer::{DEFAULT_CHUNK_SIZE, ResponseWriter, WriteGate};
use crate::resolver::ContentResolver;

const READ_CHUNK: usize = 1024;

/// Per-connection limits.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// How long to wait for the first request bytes
    pub idle_timeout: Duration,
    /// Longest accepted request line, terminator excluded
    pub max_request_len: usize,
    /// Body bytes per write
    pub chunk_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(1),
            max_request_len: 1024,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// How a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A status line was written
    Responded(Status),
    /// The idle timer fired before any request bytes arrived
    TimedOut,
    /// The peer left without sending anything
    Abandoned,
}

/// Drives one accepted stream from first byte to close.
pub struct Connection<S, R> {
    stream: S,
    session: Session,
    resolver: Arc<R>,
    settings: ConnectionSettings,
    gate: WriteGate,
}

impl<S, R> Connection<S, R>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: ContentResolver,
{
    pub fn new(stream: S, resolver: Arc<R>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            session: Session::new(settings.max_request_len),
            resolver,
            settings,
            gate: WriteGate::new(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<Outcome> {
        let outcome = match self.read_request().await? {
            Step::Resolve(request) => {
                debug!(url = %request.url, path = %request.path, "Request received");
                let status = self.send_file(&request.path).await?;
                Outcome::Responded(status)
            }
            Step::Reject(rejection) => {
                debug!(reason = ?rejection, "Request rejected");
                self.send_error(rejection.status(), rejection.message()).await?;
                Outcome::Responded(rejection.status())
            }
            Step::Close | Step::NeedMore => {
                let timed_out = self.session.timer() == IdleTimer::Fired;
                self.session.close();
                if timed_out {
                    debug!("Idle timeout, closing");
                    Outcome::TimedOut
                } else {
                    debug!("Peer closed before sending a request");
                    Outcome::Abandoned
                }
            }
        };

        Ok(outcome)
    }

    /// Reads until the session produces a decision.
    async fn read_request(&mut self) -> anyhow::Result<Step> {
        let deadline = Instant::now() + self.settings.idle_timeout;
        let mut temp = [0u8; READ_CHUNK];

        loop {
            let n = if self.session.timer_armed() {
                match timeout_at(deadline, self.stream.read(&mut temp)).await {
                    Ok(read) => read?,
                    Err(_) => return Ok(self.session.on_timeout()),
                }
            } else {
                self.stream.read(&mut temp).await?
            };

            let step = if n == 0 {
                self.session.on_eof()
            } else {
                self.session.on_bytes(&temp[..n])
            };

            if step != Step::NeedMore {
                return Ok(step);
            }
        }
    }

    async fn resolve(&self, path: &str) -> Response {
        match self.resolver.resolve(path).await {
            Ok(Some(resolved)) => Response::success(resolved.mime, resolved.body),
            Ok(None) => Response::not_found(),
            Err(e) => {
                warn!(path, error = %e, "Resolver failed");
                Response::not_found()
            }
        }
    }

    /// Writes `<code> <message>\r\n` and closes.
    pub async fn send_error(&mut self, status: Status, message: &str) -> anyhow::Result<()> {
        self.send(Response::error(status, message)).await
    }

    /// Resolves `path` and streams it with a 20, or sends a 40 if absent.
    pub async fn send_file(&mut self, path: &str) -> anyhow::Result<Status> {
        let response = self.resolve(path).await;
        let status = response.status;
        self.session.begin_response();
        self.send(response).await?;
        Ok(status)
    }

    async fn send(&mut self, response: Response) -> anyhow::Result<()> {
        let status = response.status.code();
        let meta = response.meta.clone();

        let mut writer = ResponseWriter::new(&mut self.stream, self.gate.clone(), self.settings.chunk_size);
        let body_bytes = writer.send(response).await?;
        let peak_buffered = writer.peak_buffered();
        let total = writer.finish().await?;

        self.session.close();
        info!(status, meta = %meta, body_bytes, total, peak_buffered, "Response sent");
        Ok(())
    }
}
