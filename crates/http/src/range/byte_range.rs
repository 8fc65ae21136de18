use http::{HeaderMap, header};
use tracing::debug;

use super::RangeError;

/// A single `bytes=<start>-<end>` range, both bounds inclusive.
///
/// An absent start means the beginning of the resource and an absent end means
/// its last byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Result<Self, RangeError> {
        match end {
            Some(end) if end < start => Err(RangeError::invalid(format!("end {end} before start {start}"))),
            _ => Ok(Self { start, end }),
        }
    }

    /// Parses the value of a `Range` header.
    pub fn parse(value: &str) -> Result<Self, RangeError> {
        let (unit, ranges) = value.trim().split_once('=').ok_or_else(|| RangeError::invalid("missing '='"))?;
        if !unit.trim().eq_ignore_ascii_case("bytes") {
            return Err(RangeError::invalid(format!("unsupported unit {unit}")));
        }
        if ranges.contains(',') {
            return Err(RangeError::invalid("multiple ranges"));
        }

        let (start, end) = ranges.split_once('-').ok_or_else(|| RangeError::invalid("missing '-'"))?;
        let start = match start.trim() {
            "" => 0,
            s => s.parse::<u64>().map_err(|_| RangeError::invalid(format!("bad start {s}")))?,
        };
        let end = match end.trim() {
            "" => None,
            e => Some(e.parse::<u64>().map_err(|_| RangeError::invalid(format!("bad end {e}")))?),
        };

        Self::new(start, end)
    }

    /// The request's `Range`, if present and well formed. Malformed values are
    /// ignored, as if the header had not been sent.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(header::RANGE)?;
        let parsed = value.to_str().map_err(RangeError::invalid).and_then(Self::parse);
        match parsed {
            Ok(range) => Some(range),
            Err(e) => {
                debug!(cause = %e, "ignore range header");
                None
            }
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> Option<u64> {
        self.end
    }

    /// Clamps the range to a resource of `total` bytes.
    pub fn resolve(&self, total: u64) -> Result<ResolvedRange, RangeError> {
        if self.start >= total {
            return Err(RangeError::Unsatisfiable { start: self.start, length: total });
        }

        let last = total - 1;
        let end = self.end.map_or(last, |end| end.min(last));
        Ok(ResolvedRange { start: self.start, end, total })
    }
}

/// A range known to lie inside a resource of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    start: u64,
    end: u64,
    total: u64,
}

impl ResolvedRange {
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte of the range, inclusive.
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    #[allow(clippy::len_without_is_empty, reason = "a resolved range always covers at least one byte")]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value: `<start>-<end>/<total>`.
    pub fn content_range(&self) -> String {
        format!("{}-{}/{}", self.start, self.end, self.total)
    }
}
