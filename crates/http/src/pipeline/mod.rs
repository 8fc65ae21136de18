//! The transfer pipeline of a response body.
//!
//! Bytes written by a handler pass through the stages an
//! [`EncodingDecision`](crate::negotiate::EncodingDecision) asks for, in a fixed order:
//!
//! ```text
//! handler bytes -> [gzip] -> [chunk framing | length check] -> socket buffer
//! ```
//!
//! Range selection happens before the pipeline, in the content source. Finishing
//! closes the stages outer to inner, so the gzip trailer is chunk framed and the
//! last chunk follows the last compressed byte.

mod body_encoder;
mod compress;

pub use body_encoder::BodyEncoder;
pub use body_encoder::TransferPipeline;
