use crate::gemini::request::Request;
use crate::gemini::response::Status;

/// Bytes of the scheme prefix checked before a full line has arrived.
pub const SCHEME_PREFIX: &[u8] = b"gemini:";

/// Line terminator for requests and status lines.
pub const CRLF: &[u8] = b"\r\n";

/// Reasons a request is refused before it reaches the resolver.
///
/// Every rejection is answered with a status 59 line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The request does not start with `gemini:`
    UnsupportedScheme,
    /// Not UTF-8, not a URL, or the client hung up before `\r\n`
    Malformed,
    /// No terminator within the configured request length
    LineTooLong,
}

impl Rejection {
    pub fn status(&self) -> Status {
        Status::BadRequest
    }

    pub fn message(&self) -> &'static str {
        match self {
            Rejection::UnsupportedScheme => "Only Gemini requests are supported",
            Rejection::Malformed => "Bad Request",
            Rejection::LineTooLong => "Request line too long",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Rejection {}

/// Outcome of feeding bytes to the request parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Need more bytes
    Incomplete,
    /// A full request line was found and parsed
    Complete(Request),
    /// The input can never become a valid request
    Rejected(Rejection),
}

/// Inspects the accumulated input buffer.
///
/// The scheme prefix is judged as soon as enough bytes exist to do so, so a
/// wrong scheme is refused without waiting for the rest of the line. Bytes
/// after the first terminator are ignored.
pub fn parse_request(buf: &[u8], max_len: usize) -> ParseOutcome {
    if buf.len() >= SCHEME_PREFIX.len() && !buf.starts_with(SCHEME_PREFIX) {
        return ParseOutcome::Rejected(Rejection::UnsupportedScheme);
    }

    let Some(end) = find_line_end(buf) else {
        // The terminator may still arrive right after max_len bytes.
        if buf.len() > max_len + 1 {
            return ParseOutcome::Rejected(Rejection::LineTooLong);
        }
        return ParseOutcome::Incomplete;
    };

    if end > max_len {
        return ParseOutcome::Rejected(Rejection::LineTooLong);
    }

    let line = match std::str::from_utf8(&buf[..end]) {
        Ok(line) => line,
        Err(_) => return ParseOutcome::Rejected(Rejection::Malformed),
    };

    match Request::parse(line) {
        Ok(request) => ParseOutcome::Complete(request),
        Err(rejection) => ParseOutcome::Rejected(rejection),
    }
}

/// Position of the first `\r\n` in `buf`.
pub fn find_line_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
