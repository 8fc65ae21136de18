//! HTTP connection handling module
//!
//! This module drives one client connection from the first request to the close of
//! the socket.
//!
//! # Components
//!
//! - [`HttpConnection`]: Main connection handler that:
//!   - Decodes requests and streams their bodies to the handler
//!   - Negotiates the encoding of each response
//!   - Keeps the connection open between requests when both sides allow it
//!   - Answers `Expect: 100-continue`
//!   - Turns into a byte relay after a successful CONNECT
//! - [`ResponseWriter`]: buffers the response on the wire and enforces its lifecycle
//! - [`ConnectionConfig`]: keep-alive, encoding and buffer settings

mod config;
mod http_connection;
mod response_writer;

pub use config::ConnectionConfig;
pub use http_connection::HttpConnection;
pub use response_writer::ResponseWriter;
