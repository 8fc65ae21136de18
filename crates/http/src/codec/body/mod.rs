//! Body framing for requests and responses.
//!
//! ## Decoders
//! - [`ChunkedDecoder`]: chunked transfer encoding, streamed as it arrives
//! - [`ChunkedReader`]: `read(n)`/`read_chunk()` over a chunked `AsyncRead`
//! - [`LengthDecoder`]: Content-Length delimited payloads
//! - [`PayloadDecoder`]: picks one of the above from the request head
//!
//! ## Encoders
//! - [`ChunkedEncoder`]: chunk framing with a buffering threshold
//! - [`LengthEncoder`]: pass-through bounded by the declared length
//! - [`PayloadEncoder`]: picks one of the above for a response

mod chunked_decoder;
mod chunked_encoder;
mod chunked_reader;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::{ChunkedEncoder, DEFAULT_CHUNK_THRESHOLD};
pub use chunked_reader::ChunkedReader;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
