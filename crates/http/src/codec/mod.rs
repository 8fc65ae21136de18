//! Codecs for HTTP/1.1 messages.
//!
//! - Requests: [`RequestDecoder`] decodes the head with [`HeaderDecoder`] and then the
//!   body with a [`PayloadDecoder`], yielding a stream of
//!   [`Message`](crate::protocol::Message)s for `FramedRead`
//! - Responses: [`HeaderEncoder`] writes the head, the body is framed by the
//!   [`TransferPipeline`](crate::pipeline::TransferPipeline) on top of
//!   [`PayloadEncoder`]
//! - [`ChunkedEncoder`], [`ChunkedDecoder`] and [`ChunkedReader`] implement
//!   chunked transfer encoding on their own as well
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use ferry_http::codec::{ChunkedEncoder, RequestDecoder};
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET / HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let message = decoder.decode(&mut buffer).unwrap();
//! assert!(message.is_some_and(|m| m.is_header()));
//!
//! let mut encoder = ChunkedEncoder::with_threshold(0);
//! let mut wire = BytesMut::new();
//! encoder.write(b"hello", &mut wire).unwrap();
//! encoder.finish(&mut wire).unwrap();
//! assert_eq!(&wire[..], b"5\r\nhello\r\n0\r\n\r\n");
//! ```

mod body;
mod header;
mod request_decoder;

pub use body::{
    ChunkedDecoder, ChunkedEncoder, ChunkedReader, DEFAULT_CHUNK_THRESHOLD, LengthDecoder, LengthEncoder, PayloadDecoder,
    PayloadEncoder,
};
pub use header::{HeaderDecoder, HeaderEncoder};
pub use request_decoder::RequestDecoder;
