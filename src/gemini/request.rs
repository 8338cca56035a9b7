use url::Url;

use crate::gemini::parser::Rejection;

/// URL scheme every request must carry.
pub const SCHEME: &str = "gemini";

/// A parsed Gemini request.
///
/// The request line is parsed as a generic URL. Host, port, query and
/// fragment are accepted and kept on `url`, but only the path takes part
/// in resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The full URL as sent by the client
    pub url: Url,
    /// The URL path, never empty (`/` for a bare host)
    pub path: String,
}

impl Request {
    /// Parses a request line (without its `\r\n` terminator).
    ///
    /// # Example
    ///
    /// ```
    /// # use gemserve::gemini::request::Request;
    /// let req = Request::parse("gemini://example.org/docs/").unwrap();
    /// assert_eq!(req.path, "/docs/");
    /// assert_eq!(req.host(), Some("example.org"));
    /// ```
    pub fn parse(line: &str) -> Result<Self, Rejection> {
        let url = Url::parse(line).map_err(|_| Rejection::Malformed)?;

        if url.scheme() != SCHEME {
            return Err(Rejection::UnsupportedScheme);
        }

        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Self { url, path })
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// The query string, if any. Never consulted when resolving content.
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }
}
