//! Response encoding negotiation.
//!
//! Decides, per response, whether the body is gzip compressed and whether it is
//! framed with chunked transfer encoding, and renders the headers that announce
//! those choices:
//!
//! - [`EncodingConfig`]: the server wide knobs (gzip on/off, level, chunk threshold)
//! - [`EncodingNegotiator`]: turns request headers and response metadata into a decision
//! - [`EncodingDecision`]: the outcome, consumed by the header encoder and the
//!   [`TransferPipeline`](crate::pipeline::TransferPipeline)

mod config;
mod decision;
mod negotiator;

pub use config::EncodingConfig;
pub use decision::EncodingDecision;
pub use negotiator::EncodingNegotiator;
pub use negotiator::accepts_encoding;
