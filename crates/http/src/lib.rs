//! An asynchronous HTTP/1.1 transfer layer
//!
//! This crate moves HTTP/1.1 message bodies between a socket and a handler: it frames
//! them with chunked transfer encoding or a fixed length, compresses them with gzip
//! when the client accepts it, serves byte ranges of seekable sources, and turns a
//! connection into a raw tunnel after a `CONNECT`. It is built on top of tokio and
//! the `http`/`http-body` types.
//!
//! # Features
//!
//! - Chunked transfer encoding, both directions, with a configurable chunk threshold
//! - Per response negotiation of gzip and framing from `Accept-Encoding`
//! - Single byte ranges over any `AsyncRead + AsyncSeek` source
//! - CONNECT tunnels with a bidirectional byte relay
//! - Keep-alive connections and the expect-continue mechanism
//! - Streaming request and response bodies
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use ferry_http::connection::{ConnectionConfig, HttpConnection};
//! use ferry_http::handler::make_handler;
//! use ferry_http::negotiate::EncodingConfig;
//! use ferry_http::protocol::body::ReqBody;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use std::error::Error;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt().init();
//!
//!     let listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(listener) => listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!     let config = ConnectionConfig::default().with_encoding(EncodingConfig::default().with_gzip(true));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::with_config(reader, writer, config);
//!             match connection.process(handler).await {
//!                 Ok(()) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!(cause = %e, "service has error, connection shutdown"),
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(_request: Request<ReqBody>) -> Result<Response<Full<Bytes>>, Box<dyn Error + Send + Sync>> {
//!     Ok(Response::new(Full::new(Bytes::from_static(b"Hello World!\r\n"))))
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: drives a client connection, request by request
//! - [`codec`]: request decoding, response head encoding and chunked framing
//! - [`negotiate`]: decides the encoding of each response
//! - [`pipeline`]: the chain of body stages (gzip, then framing) a response goes through
//! - [`range`]: `Range` header parsing and windowed reads of seekable sources
//! - [`tunnel`]: CONNECT targets and the byte relay
//! - [`protocol`]: message, request, response and error types
//! - [`handler`]: the request handler trait
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: top level error of a connection
//! - [`protocol::ParseError`]: malformed requests and request bodies
//! - [`protocol::SendError`]: response writing, including lifecycle misuse
//! - [`range::RangeError`] and [`tunnel::TunnelError`] for their modules
//!
//! # Limitations
//!
//! - HTTP/1.1 only
//! - No TLS, tunnels carry whatever the client sends
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod negotiate;
pub mod pipeline;
pub mod protocol;
pub mod range;
pub mod tunnel;

mod utils;
pub(crate) use utils::ensure;
