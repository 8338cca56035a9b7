use std::pin::Pin;

use tokio::io::AsyncRead;

/// Streaming response body.
pub type Body = Pin<Box<dyn AsyncRead + Send>>;

/// Gemini status codes produced by the server.
///
/// - `Success` (20): body follows, meta is the MIME type
/// - `TemporaryFailure` (40): resource absent or unreadable
/// - `BadRequest` (59): malformed or non-Gemini request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 20 SUCCESS
    Success,
    /// 40 TEMPORARY FAILURE
    TemporaryFailure,
    /// 59 BAD REQUEST
    BadRequest,
}

impl Status {
    /// Returns the two-digit status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use gemserve::gemini::response::Status;
    /// assert_eq!(Status::Success.code(), 20);
    /// assert_eq!(Status::BadRequest.code(), 59);
    /// ```
    pub fn code(&self) -> u8 {
        match self {
            Status::Success => 20,
            Status::TemporaryFailure => 40,
            Status::BadRequest => 59,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

/// A complete response: status, meta and, on success only, a body.
pub struct Response {
    /// The status code
    pub status: Status,
    /// MIME type on success, human-readable error text otherwise
    pub meta: String,
    /// Body stream, present only for `Status::Success`
    pub body: Option<Body>,
}

impl Response {
    /// A 20 response streaming `body` with the given MIME type.
    pub fn success(mime: impl Into<String>, body: Body) -> Self {
        Self {
            status: Status::Success,
            meta: mime.into(),
            body: Some(body),
        }
    }

    /// A bodiless error response.
    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            meta: message.into(),
            body: None,
        }
    }

    /// Creates a 40 "File not found" response.
    pub fn not_found() -> Self {
        Self::error(Status::TemporaryFailure, "File not found")
    }

    /// Serializes the status line, `<code> <meta>\r\n`.
    pub fn status_line(&self) -> String {
        format!("{} {}\r\n", self.status.code(), self.meta)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("meta", &self.meta)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}
