//! Request head decoding and response head encoding.
//!
//! - [`HeaderDecoder`]: parses the request line and header fields, and picks the
//!   framing of the request body
//! - [`HeaderEncoder`]: writes the status line and header fields, with the framing
//!   and encoding headers taken from an
//!   [`EncodingDecision`](crate::negotiate::EncodingDecision)

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
