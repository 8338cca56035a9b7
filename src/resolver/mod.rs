//! Content resolution
//!
//! A resolver maps a request path to a byte stream plus its MIME type, or
//! reports that nothing lives there. Connections hold resolvers behind an
//! `Arc` and never mutate them.

pub mod file;
pub mod memory;

use std::future::Future;

use crate::gemini::response::Body;

pub use file::FileResolver;
pub use memory::StaticResolver;

/// A resolved resource, ready to stream.
pub struct Resolved {
    /// MIME type sent as the response meta
    pub mime: String,
    /// Resource contents
    pub body: Body,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved").field("mime", &self.mime).finish()
    }
}

/// Maps request paths to content.
///
/// `Ok(None)` means the resource is absent; `Err` is an unexpected failure
/// (permissions, I/O). Both end up as a 40 response.
pub trait ContentResolver: Send + Sync + 'static {
    fn resolve(
        &self,
        path: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Resolved>>> + Send;
}
