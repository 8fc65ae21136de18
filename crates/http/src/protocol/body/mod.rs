//! HTTP request body handling.
//!
//! - [`ReqBody`]: the consumer side that implements the `http_body::Body` trait
//! - [`ReqBodySender`]: the producer side that reads from the raw payload stream
//!
//! The two communicate through channels, so the handler can read the body while the
//! connection keeps control of the socket. A body the handler leaves unread is
//! drained by [`ReqBodySender::skip_body`] before the next request is decoded.

mod req_body;

pub use req_body::ReqBody;
pub use req_body::ReqBodySender;
