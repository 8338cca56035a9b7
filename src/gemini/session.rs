//! Transport-free protocol state for one connection.
//!
//! `Session` owns the input buffer, the idle-timer state and the current
//! protocol state. The async [`Connection`](crate::gemini::connection::Connection)
//! feeds it bytes, timer expiries and end-of-stream, and acts on what it
//! returns. Nothing here touches I/O, so every transition can be driven
//! from a test with synthetic chunks.

use crate::gemini::parser::{ParseOutcome, Rejection, parse_request};
use crate::gemini::request::Request;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRequest,
    Resolving(Request),
    SendingResponse,
    Closed,
}

/// One-shot idle timer state.
///
/// Starts `Armed`. Leaves that state exactly once, either to `Cancelled`
/// (bytes arrived) or to `Fired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTimer {
    Armed,
    Cancelled,
    Fired,
}

/// What the connection must do after feeding the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Keep reading
    NeedMore,
    /// Resolve this request and send the result
    Resolve(Request),
    /// Send a 59 with this rejection's message, then close
    Reject(Rejection),
    /// Close without writing anything
    Close,
}

#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    timer: IdleTimer,
    buffer: Vec<u8>,
    max_request_len: usize,
}

impl Session {
    /// Creates a session in `AwaitingRequest` with the idle timer armed.
    pub fn new(max_request_len: usize) -> Self {
        Self {
            state: ConnectionState::AwaitingRequest,
            timer: IdleTimer::Armed,
            buffer: Vec::with_capacity(max_request_len.min(4096) + 2),
            max_request_len,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn timer(&self) -> IdleTimer {
        self.timer
    }

    pub fn timer_armed(&self) -> bool {
        self.timer == IdleTimer::Armed
    }

    /// Appends a chunk of input and tries to advance.
    ///
    /// Chunk boundaries are arbitrary; the terminator may be split across
    /// calls. Input arriving after the request line was found is dropped.
    pub fn on_bytes(&mut self, chunk: &[u8]) -> Step {
        if self.state != ConnectionState::AwaitingRequest {
            return Step::NeedMore;
        }

        if self.timer == IdleTimer::Armed && !chunk.is_empty() {
            self.timer = IdleTimer::Cancelled;
        }

        self.buffer.extend_from_slice(chunk);

        match parse_request(&self.buffer, self.max_request_len) {
            ParseOutcome::Incomplete => Step::NeedMore,
            ParseOutcome::Complete(request) => {
                self.buffer.clear();
                self.state = ConnectionState::Resolving(request.clone());
                Step::Resolve(request)
            }
            ParseOutcome::Rejected(rejection) => self.reject(rejection),
        }
    }

    /// The idle timer expired.
    ///
    /// Only closes the connection when the timer is still armed; a timer
    /// already cancelled by incoming bytes never fires.
    pub fn on_timeout(&mut self) -> Step {
        if self.timer != IdleTimer::Armed {
            return Step::NeedMore;
        }

        self.timer = IdleTimer::Fired;
        self.state = ConnectionState::Closed;
        Step::Close
    }

    /// The peer closed its write side.
    pub fn on_eof(&mut self) -> Step {
        if self.state != ConnectionState::AwaitingRequest {
            return Step::NeedMore;
        }

        if self.buffer.is_empty() {
            if self.timer == IdleTimer::Armed {
                self.timer = IdleTimer::Cancelled;
            }
            self.state = ConnectionState::Closed;
            return Step::Close;
        }

        self.reject(Rejection::Malformed)
    }

    /// Resolution finished; the response is about to be written.
    pub fn begin_response(&mut self) {
        if let ConnectionState::Resolving(_) = self.state {
            self.state = ConnectionState::SendingResponse;
        }
    }

    pub fn close(&mut self) {
        if self.timer == IdleTimer::Armed {
            self.timer = IdleTimer::Cancelled;
        }
        self.buffer.clear();
        self.state = ConnectionState::Closed;
    }

    fn reject(&mut self, rejection: Rejection) -> Step {
        self.buffer.clear();
        self.state = ConnectionState::SendingResponse;
        Step::Reject(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(session: &mut Session, chunks: &[&[u8]]) -> Step {
        let mut last = Step::NeedMore;
        for chunk in chunks {
            last = session.on_bytes(chunk);
            if last != Step::NeedMore {
                break;
            }
        }
        last
    }

    #[test]
    fn request_split_across_chunks() {
        let mut session = Session::new(1024);
        let step = feed_all(&mut session, &[b"gem", b"ini://host/a", b"\r", b"\nextra"]);

        match step {
            Step::Resolve(req) => assert_eq!(req.path, "/a"),
            other => panic!("unexpected step: {:?}", other),
        }
        assert!(matches!(session.state(), ConnectionState::Resolving(_)));
    }

    #[test]
    fn every_split_point_yields_same_request() {
        let input = b"gemini://example.org/docs/page.gmi?q=1\r\n";

        for split in 1..input.len() {
            let mut session = Session::new(1024);
            let step = feed_all(&mut session, &[&input[..split], &input[split..]]);

            match step {
                Step::Resolve(req) => {
                    assert_eq!(req.url.as_str(), "gemini://example.org/docs/page.gmi?q=1");
                    assert_eq!(req.path, "/docs/page.gmi");
                }
                other => panic!("split at {}: unexpected step {:?}", split, other),
            }
        }
    }

    #[test]
    fn byte_at_a_time() {
        let input = b"gemini://host/\r\n";
        let mut session = Session::new(1024);
        let chunks: Vec<&[u8]> = input.chunks(1).collect();

        assert!(matches!(feed_all(&mut session, &chunks), Step::Resolve(_)));
    }

    #[test]
    fn first_bytes_cancel_timer() {
        let mut session = Session::new(1024);
        assert!(session.timer_armed());

        session.on_bytes(b"g");
        assert_eq!(session.timer(), IdleTimer::Cancelled);
        assert_eq!(session.on_timeout(), Step::NeedMore);
        assert_eq!(session.state(), &ConnectionState::AwaitingRequest);
    }

    #[test]
    fn timeout_fires_once() {
        let mut session = Session::new(1024);

        assert_eq!(session.on_timeout(), Step::Close);
        assert_eq!(session.timer(), IdleTimer::Fired);
        assert_eq!(session.state(), &ConnectionState::Closed);
        assert_eq!(session.on_timeout(), Step::NeedMore);
    }

    #[test]
    fn timer_never_fires_after_terminator() {
        let mut session = Session::new(1024);
        session.on_bytes(b"gemini://host/\r\n");

        assert_eq!(session.on_timeout(), Step::NeedMore);
        assert!(matches!(session.state(), ConnectionState::Resolving(_)));
    }

    #[test]
    fn wrong_scheme_rejected_once_seven_bytes_buffered() {
        let mut session = Session::new(1024);

        assert_eq!(session.on_bytes(b"http:/"), Step::NeedMore);
        assert_eq!(
            session.on_bytes(b"/"),
            Step::Reject(Rejection::UnsupportedScheme)
        );
        assert_eq!(session.state(), &ConnectionState::SendingResponse);
        // Further input is ignored
        assert_eq!(session.on_bytes(b"host/\r\n"), Step::NeedMore);
    }

    #[test]
    fn overlong_line_rejected() {
        let mut session = Session::new(32);
        let mut line = b"gemini://host/".to_vec();
        line.extend(std::iter::repeat_n(b'a', 40));

        assert_eq!(session.on_bytes(&line), Step::Reject(Rejection::LineTooLong));
    }

    #[test]
    fn line_of_exactly_max_len_accepted() {
        let mut line = b"gemini://host/".to_vec();
        line.extend(std::iter::repeat_n(b'a', 18));
        assert_eq!(line.len(), 32);

        let mut session = Session::new(32);
        assert_eq!(session.on_bytes(&line), Step::NeedMore);
        assert_eq!(session.on_bytes(b"\r"), Step::NeedMore);
        assert!(matches!(session.on_bytes(b"\n"), Step::Resolve(_)));
    }

    #[test]
    fn eof_mid_line_is_malformed() {
        let mut session = Session::new(1024);
        session.on_bytes(b"gemini://host");

        assert_eq!(session.on_eof(), Step::Reject(Rejection::Malformed));
    }

    #[test]
    fn eof_without_bytes_closes_silently() {
        let mut session = Session::new(1024);

        assert_eq!(session.on_eof(), Step::Close);
        assert_eq!(session.state(), &ConnectionState::Closed);
        assert_eq!(session.on_timeout(), Step::NeedMore);
    }

    #[test]
    fn full_lifecycle() {
        let mut session = Session::new(1024);
        session.on_bytes(b"gemini://host/\r\n");
        session.begin_response();
        assert_eq!(session.state(), &ConnectionState::SendingResponse);

        session.close();
        assert_eq!(session.state(), &ConnectionState::Closed);
    }
}
