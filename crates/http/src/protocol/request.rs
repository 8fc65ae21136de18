//! HTTP request header handling implementation.
//!
//! This module wraps the standard `http::Request<()>` with the few questions the
//! transfer layer needs answered about a request: whether it carries a body,
//! whether the client wants the connection kept open, and what it accepts.

use http::header::{self, HeaderValue};
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// Represents an HTTP request header.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Determines if this request may carry a body based on its HTTP method.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// Whether the client asked for the connection to be closed after this exchange.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is present;
    /// HTTP/1.0 defaults to close unless `Connection: keep-alive` is present.
    pub fn wants_close(&self) -> bool {
        let connection = self.headers().get(header::CONNECTION);
        match self.version() {
            Version::HTTP_11 => has_token(connection, "close"),
            _ => !has_token(connection, "keep-alive"),
        }
    }

    /// Returns true when the client sent `Expect: 100-continue`.
    pub fn expects_continue(&self) -> bool {
        self.headers()
            .get(header::EXPECT)
            .map(|value| value.as_bytes().len() >= 4 && value.as_bytes()[..4].eq_ignore_ascii_case(b"100-"))
            .unwrap_or(false)
    }
}

/// Case-insensitive search for `token` in a comma separated header value.
fn has_token(value: Option<&HeaderValue>, token: &str) -> bool {
    value
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').any(|item| item.trim().eq_ignore_ascii_case(token)))
        .unwrap_or(false)
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
