//! Gemini protocol implementation.
//!
//! One request line in, one status line plus optional body out, then the
//! connection closes. There is no keep-alive and no pipelining.
//!
//! # Architecture
//!
//! - **`session`**: transport-free state machine: buffering, scheme check, idle timer
//! - **`connection`**: async driver binding a `Session` to a stream and a resolver
//! - **`parser`**: request-line framing and rejection reasons
//! - **`request`**: parsed request (URL and path)
//! - **`response`**: status codes and responses
//! - **`writer`**: status line and chunked body output with backpressure
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← idle timer armed, cancelled by first byte
//!        └──────┬───────────┘
//!               │ "\r\n" seen            ── bad scheme / too long ──┐
//!               ▼                                                   │
//!        ┌──────────────────┐                                       │
//!        │    Resolving     │ ← ask the ContentResolver             │
//!        └──────┬───────────┘                                       │
//!               │ 20 or 40                                          │ 59
//!               ▼                                                   │
//!        ┌──────────────────┐                                       │
//!        │ SendingResponse  │ ◄─────────────────────────────────────┘
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │      Closed      │ ← also reached directly on idle timeout
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gemserve::gemini::connection::{Connection, ConnectionSettings};
//! use gemserve::resolver::FileResolver;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:1965").await?;
//!     let resolver = Arc::new(FileResolver::new("public", "index.gmi"));
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let resolver = resolver.clone();
//!         tokio::spawn(async move {
//!             let conn = Connection::new(socket, resolver, ConnectionSettings::default());
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod session;
pub mod writer;
