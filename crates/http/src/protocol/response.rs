//! HTTP response header handling implementation.
//!
//! The standard `http::Response` type with an empty body placeholder represents
//! the response head before the body is streamed through the transfer pipeline.

use http::{Response, StatusCode};

/// Type alias for HTTP response headers.
pub type ResponseHead = Response<()>;

/// Statuses that never carry a message body (RFC 7230 §3.3.3).
pub fn is_bodiless_status(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}
