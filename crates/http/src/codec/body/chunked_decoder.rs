//! Decoder for HTTP chunked transfer encoding.
//!
//! Parses the framing described in
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1): a hex size
//! line with optional extensions, the chunk data and CRLF, repeated until the zero-size
//! last chunk. Extensions and trailer fields are read and discarded.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, Bytes, BytesMut};
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

/// A decoder for chunked transfer encoding.
///
/// Chunk data is handed out as soon as it arrives, so a large chunk is streamed in
/// several pieces instead of being buffered whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// One unit of progress through a chunked body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    /// Data belonging to the current chunk, possibly only part of it
    Data(Bytes),
    /// The CRLF closing a chunk has been consumed
    ChunkEnd,
    /// The last chunk and trailer section have been consumed
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    SizeStart,
    Size,
    SizeLws,
    Extension,
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: SizeStart, remaining_size: 0 }
    }

    /// Returns true once the last chunk and the trailer section have been read.
    pub fn is_finish(&self) -> bool {
        self.state == End
    }

    /// Consumes bytes from `src` until a [`Step`] can be reported.
    ///
    /// Returns `Ok(None)` when `src` runs out before anything could be reported.
    pub(crate) fn advance(&mut self, src: &mut BytesMut) -> Result<Option<Step>, ParseError> {
        loop {
            if self.state == End {
                return Ok(Some(Step::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut buf = None;
            let previous = self.state;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(Step::Data(bytes)));
            }

            if previous == BodyLf && self.state == SizeStart {
                return Ok(Some(Step::ChunkEnd));
            }
        }
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.advance(src)? {
                Some(Step::Data(bytes)) => return Ok(Some(PayloadItem::Chunk(bytes))),
                Some(Step::ChunkEnd) => continue,
                Some(Step::Eof) => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }
                None => return Ok(None),
            }
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.len() > 0 {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

macro_rules! malformed {
    ($reason:expr) => {
        Poll::Ready(Err(ParseError::malformed_chunk($reason)))
    };
}

impl ChunkedState {
    fn step(&self, src: &mut BytesMut, remaining_size: &mut u64, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        match self {
            SizeStart => ChunkedState::read_size_start(src, remaining_size),
            Size => ChunkedState::read_size(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src),
            Extension => ChunkedState::read_extension(src),
            SizeLf => ChunkedState::read_size_lf(src, remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, buf),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            Trailer => ChunkedState::read_trailer(src),
            TrailerLf => ChunkedState::read_trailer_lf(src),
            EndCr => ChunkedState::read_end_cr(src),
            EndLf => ChunkedState::read_end_lf(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// The size line must open with a hex digit.
    fn read_size_start(src: &mut BytesMut, size: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        let Some(digit) = hex_value(try_next_byte!(src)) else {
            return malformed!("missing chunk size");
        };
        *size = u64::from(digit);
        Poll::Ready(Ok(Size))
    }

    /// Accumulates one hex digit of the size, either case accepted.
    fn read_size(src: &mut BytesMut, size: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        let digit = match try_next_byte!(src) {
            b @ (b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F') => hex_value(b).unwrap_or_default(),
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            _ => return malformed!("invalid hex digit in chunk size"),
        };

        match size.checked_mul(16).and_then(|s| s.checked_add(u64::from(digit))) {
            Some(new_size) => {
                *size = new_size;
                Poll::Ready(Ok(Size))
            }
            None => malformed!("chunk size overflow"),
        }
    }

    fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        // no more digits may follow whitespace
        match try_next_byte!(src) {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            _ => malformed!("invalid whitespace in chunk size line"),
        }
    }

    fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        // extensions are ignored up to CRLF, a bare LF is rejected
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => malformed!("chunk extension contains newline"),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    fn read_size_lf(src: &mut BytesMut, size: &mut u64) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' if *size == 0 => Poll::Ready(Ok(EndCr)),
            b'\n' => Poll::Ready(Ok(Body)),
            _ => malformed!("expected LF after chunk size"),
        }
    }

    fn read_body(src: &mut BytesMut, size: &mut u64, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        if src.is_empty() {
            return Poll::Pending;
        }

        if *size == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        let remaining = usize::try_from(*size).unwrap_or(usize::MAX);
        let read_size = std::cmp::min(remaining, src.len());

        *size -= read_size as u64;
        *buf = Some(src.split_to(read_size).freeze());

        if *size > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            _ => malformed!("expected CRLF after chunk data"),
        }
    }

    fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(SizeStart)),
            _ => malformed!("expected CRLF after chunk data"),
        }
    }

    fn read_trailer(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(TrailerLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn read_trailer_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(EndCr)),
            _ => malformed!("expected LF after trailer field"),
        }
    }

    /// Either the empty line closing the body or the start of a trailer field.
    fn read_end_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(EndLf)),
            _ => Poll::Ready(Ok(Trailer)),
        }
    }

    fn read_end_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(End)),
            _ => malformed!("expected LF after last chunk"),
        }
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b + 10 - b'a'),
        b'A'..=b'F' => Some(b + 10 - b'A'),
        _ => None,
    }
}
