//! Encoder for HTTP chunked transfer encoding.
//!
//! Each chunk is written as its size in lowercase hex, CRLF, the data and CRLF.
//! The body ends with the zero-size last chunk and an empty trailer section:
//! `0\r\n\r\n`. See [RFC 2616 Section 3.6.1](https://tools.ietf.org/html/rfc2616#section-3.6.1).

use crate::protocol::{PayloadItem, ResponseState, SendError};
use bytes::{Buf, BytesMut};
use std::io::Write;

use tokio_util::codec::Encoder;
use tracing::trace;

/// Default number of bytes buffered before a chunk is emitted.
pub const DEFAULT_CHUNK_THRESHOLD: usize = 4096;

const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Open,
    Finished,
    Closed,
}

/// Frames an unbounded byte stream as chunks.
///
/// Writes are buffered until `threshold` bytes are pending, then emitted as a single
/// chunk. A threshold of `0` emits every write as its own chunk. Output goes to the
/// caller supplied `BytesMut`, the encoder itself performs no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    threshold: usize,
    buffer: BytesMut,
    state: State,
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_CHUNK_THRESHOLD)
    }

    pub fn with_threshold(threshold: usize) -> Self {
        Self { threshold, buffer: BytesMut::new(), state: State::Open }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns true once the last chunk has been written.
    pub fn is_finish(&self) -> bool {
        self.state != State::Open
    }

    /// Number of bytes waiting to be emitted as the next chunk.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Accepts `data`, emitting a chunk into `dst` when the threshold is reached.
    pub fn write(&mut self, data: &[u8], dst: &mut BytesMut) -> Result<usize, SendError> {
        self.ensure_open()?;

        if self.threshold == 0 {
            write_chunk(data, dst);
            return Ok(data.len());
        }

        self.buffer.extend_from_slice(data);
        if self.buffer.len() >= self.threshold {
            self.flush_chunk(dst)?;
        }
        Ok(data.len())
    }

    /// Like [`write`](Self::write), then forces the buffered bytes out as a chunk.
    pub fn write_with_flush(&mut self, data: &[u8], dst: &mut BytesMut) -> Result<usize, SendError> {
        let written = self.write(data, dst)?;
        self.flush_chunk(dst)?;
        Ok(written)
    }

    /// Emits the buffered bytes as one chunk; does nothing when the buffer is empty.
    pub fn flush_chunk(&mut self, dst: &mut BytesMut) -> Result<(), SendError> {
        self.ensure_open()?;

        if self.buffer.is_empty() {
            return Ok(());
        }

        let pending = self.buffer.split();
        write_chunk(&pending, dst);
        Ok(())
    }

    /// Flushes pending bytes, then writes the last chunk and the empty trailer.
    pub fn finish(&mut self, dst: &mut BytesMut) -> Result<(), SendError> {
        self.flush_chunk(dst)?;
        dst.extend_from_slice(LAST_CHUNK);
        self.state = State::Finished;
        trace!("wrote last chunk");
        Ok(())
    }

    /// Finishes the body if that hasn't happened yet. Closing twice is a no-op.
    pub fn close(&mut self, dst: &mut BytesMut) -> Result<(), SendError> {
        match self.state {
            State::Open => self.finish(dst)?,
            State::Finished | State::Closed => {}
        }
        self.state = State::Closed;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SendError> {
        match self.state {
            State::Open => Ok(()),
            State::Finished | State::Closed => Err(SendError::closed_stream(ResponseState::BodyClosed)),
        }
    }
}

fn write_chunk(data: &[u8], dst: &mut BytesMut) {
    if data.is_empty() {
        // an empty chunk would read as the last chunk
        return;
    }

    dst.reserve(data.len() + 20);
    // writing into a BytesMut never fails
    let _ = write!(helper::Writer(dst), "{:x}\r\n", data.len());
    dst.extend_from_slice(data);
    dst.extend_from_slice(b"\r\n");
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                self.ensure_open()?;
                while bytes.has_remaining() {
                    let len = {
                        let chunk = bytes.chunk();
                        self.write(chunk, dst)?
                    };
                    bytes.advance(len);
                }
                Ok(())
            }
            PayloadItem::Eof => self.finish(dst),
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_buffered_until_threshold() {
        let mut encoder = ChunkedEncoder::with_threshold(10);
        let mut dst = BytesMut::new();

        encoder.write(b"abc", &mut dst).unwrap();
        assert!(dst.is_empty());
        assert_eq!(encoder.buffered(), 3);

        encoder.write(b"defghijklmnopqrstuvwxyz", &mut dst).unwrap();
        assert_eq!(&dst[..], b"1a\r\nabcdefghijklmnopqrstuvwxyz\r\n");
        assert_eq!(encoder.buffered(), 0);
    }

    #[test]
    fn test_forced_flush_and_finish() {
        let mut encoder = ChunkedEncoder::with_threshold(10);
        let mut dst = BytesMut::new();

        assert_eq!(encoder.write(b"abcdefghijklmnopqrstuvwxyz", &mut dst).unwrap(), 26);
        assert_eq!(encoder.write_with_flush(b"ABCDE", &mut dst).unwrap(), 5);
        encoder.finish(&mut dst).unwrap();

        assert_eq!(&dst[..], &b"1a\r\nabcdefghijklmnopqrstuvwxyz\r\n5\r\nABCDE\r\n0\r\n\r\n"[..]);
        assert!(encoder.is_finish());
    }

    #[test]
    fn test_zero_threshold_emits_each_write() {
        let mut encoder = ChunkedEncoder::with_threshold(0);
        let mut dst = BytesMut::new();

        encoder.write(b"hello", &mut dst).unwrap();
        encoder.write(b"", &mut dst).unwrap();
        encoder.write(b", world", &mut dst).unwrap();
        encoder.finish(&mut dst).unwrap();

        assert_eq!(&dst[..], b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n");
    }

    #[test]
    fn test_empty_flush_emits_nothing() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.flush_chunk(&mut dst).unwrap();
        assert!(dst.is_empty());

        encoder.finish(&mut dst).unwrap();
        assert_eq!(&dst[..], b"0\r\n\r\n");
    }

    #[test]
    fn test_lowercase_hex_size() {
        let mut encoder = ChunkedEncoder::with_threshold(0);
        let mut dst = BytesMut::new();

        encoder.write(&[b'x'; 255], &mut dst).unwrap();
        assert!(dst.starts_with(b"ff\r\n"));
    }

    #[test]
    fn test_use_after_finish_fails() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.finish(&mut dst).unwrap();

        assert!(encoder.write(b"late", &mut dst).unwrap_err().is_closed_stream());
        assert!(encoder.flush_chunk(&mut dst).unwrap_err().is_closed_stream());
        assert!(encoder.finish(&mut dst).unwrap_err().is_closed_stream());
        assert_eq!(&dst[..], b"0\r\n\r\n");
    }

    #[test]
    fn test_close_finishes_once() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();

        encoder.write(b"tail", &mut dst).unwrap();
        encoder.close(&mut dst).unwrap();
        encoder.close(&mut dst).unwrap();

        assert_eq!(&dst[..], b"4\r\ntail\r\n0\r\n\r\n");
        assert!(encoder.write(b"more", &mut dst).is_err());
    }

    #[test]
    fn test_encoder_trait() {
        let mut encoder = ChunkedEncoder::with_threshold(0);
        let mut dst = BytesMut::new();

        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        assert_eq!(&dst[..], b"5\r\nhello\r\n0\r\n\r\n");

        let result = encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"x")), &mut dst);
        assert!(result.is_err());
    }
}
