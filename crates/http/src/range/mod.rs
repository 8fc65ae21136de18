//! Byte range requests.
//!
//! [`ByteRange`] is the parsed `Range` header, [`ResolvedRange`] the same range
//! clamped against a known resource length, and [`RangeReader`] exposes only that
//! window of a seekable source.

mod byte_range;
mod error;
mod reader;

pub use byte_range::ByteRange;
pub use byte_range::ResolvedRange;
pub use error::RangeError;
pub use reader::RangeReader;
