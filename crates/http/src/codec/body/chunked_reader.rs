use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use super::chunked_decoder::{ChunkedDecoder, Step};
use crate::protocol::ParseError;

const READ_BUF_SIZE: usize = 8 * 1024;

/// Reads a chunked body from an async byte source as plain bytes.
///
/// Decoded bytes that a caller did not ask for yet are kept in a carry-over buffer
/// and served first by the next read. A short read only happens at the end of the
/// body; after that every read returns an empty `Bytes`.
///
/// ```no_run
/// # async fn demo(socket: tokio::net::TcpStream) -> Result<(), ferry_http::protocol::ParseError> {
/// use ferry_http::codec::ChunkedReader;
///
/// let mut reader = ChunkedReader::new(socket);
/// let head = reader.read(26).await?;
/// let rest = reader.read_to_end().await?;
/// assert!(reader.is_eof());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChunkedReader<R> {
    reader: R,
    decoder: ChunkedDecoder,
    /// raw bytes read from `reader` but not decoded yet
    input: BytesMut,
    /// decoded bytes not handed out yet
    carry: BytesMut,
    eof: bool,
    closed: bool,
}

impl<R> ChunkedReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_buffer(reader, BytesMut::new())
    }

    /// Starts from bytes that were already read off the source, e.g. by a header decoder.
    pub fn with_buffer(reader: R, input: BytesMut) -> Self {
        Self { reader, decoder: ChunkedDecoder::new(), input, carry: BytesMut::new(), eof: false, closed: false }
    }

    /// Reads up to `n` bytes, pulling whole chunks until enough are available.
    pub async fn read(&mut self, n: usize) -> Result<Bytes, ParseError> {
        self.ensure_open()?;

        while self.carry.len() < n && !self.eof {
            let chunk = self.next_chunk().await?;
            self.carry.extend_from_slice(&chunk);
        }

        let len = n.min(self.carry.len());
        Ok(self.carry.split_to(len).freeze())
    }

    /// Reads everything up to the last chunk.
    pub async fn read_to_end(&mut self) -> Result<Bytes, ParseError> {
        self.ensure_open()?;

        while !self.eof {
            let chunk = self.next_chunk().await?;
            self.carry.extend_from_slice(&chunk);
        }

        Ok(self.carry.split().freeze())
    }

    /// Returns the next chunk as it was framed on the wire.
    ///
    /// Pending carry-over bytes are returned first. An empty result means the last
    /// chunk has been read.
    pub async fn read_chunk(&mut self) -> Result<Bytes, ParseError> {
        self.ensure_open()?;

        if !self.carry.is_empty() {
            return Ok(self.carry.split().freeze());
        }

        self.next_chunk().await
    }

    /// Returns true once the last chunk has been read.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Discards buffered data; every later read fails with [`ParseError::ClosedStream`].
    pub fn close(&mut self) {
        self.closed = true;
        self.carry.clear();
    }

    /// Returns the source together with the bytes read past the end of the body.
    pub fn into_inner(self) -> (R, BytesMut) {
        (self.reader, self.input)
    }

    async fn next_chunk(&mut self) -> Result<Bytes, ParseError> {
        if self.eof {
            return Ok(Bytes::new());
        }

        let mut chunk = BytesMut::new();
        loop {
            match self.decoder.advance(&mut self.input)? {
                Some(Step::Data(bytes)) => chunk.extend_from_slice(&bytes),
                Some(Step::ChunkEnd) => {
                    trace!(len = chunk.len(), "read chunk");
                    return Ok(chunk.freeze());
                }
                Some(Step::Eof) => {
                    self.eof = true;
                    return Ok(Bytes::new());
                }
                None => self.fill().await?,
            }
        }
    }

    async fn fill(&mut self) -> Result<(), ParseError> {
        self.input.reserve(READ_BUF_SIZE);
        let n = self.reader.read_buf(&mut self.input).await?;
        if n == 0 {
            return Err(ParseError::io(io::Error::new(io::ErrorKind::UnexpectedEof, "body ended before the last chunk")));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ParseError> {
        if self.closed { Err(ParseError::ClosedStream) } else { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ChunkedEncoder;
    use tokio::io::AsyncWriteExt;

    fn encode(threshold: usize, writes: &[&[u8]]) -> BytesMut {
        let mut encoder = ChunkedEncoder::with_threshold(threshold);
        let mut dst = BytesMut::new();
        for data in writes {
            encoder.write(data, &mut dst).unwrap();
        }
        encoder.finish(&mut dst).unwrap();
        dst
    }

    #[tokio::test]
    async fn test_read_alphabet_written_with_threshold() {
        let mut encoder = ChunkedEncoder::with_threshold(10);
        let mut wire = BytesMut::new();
        encoder.write(b"abcdefghijklmnopqrstuvwxyz", &mut wire).unwrap();
        encoder.write_with_flush(b"ABCDE", &mut wire).unwrap();
        encoder.finish(&mut wire).unwrap();

        let mut reader = ChunkedReader::new(&wire[..]);
        assert_eq!(&reader.read(26).await.unwrap()[..], b"abcdefghijklmnopqrstuvwxyz");
        assert_eq!(&reader.read_to_end().await.unwrap()[..], b"ABCDE");
        assert!(reader.is_eof());
    }

    #[tokio::test]
    async fn test_round_trip_various_thresholds() {
        let body: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let pieces: Vec<&[u8]> = body.chunks(333).collect();

        for threshold in [1, 7, 100, 4096, 10_000] {
            let wire = encode(threshold, &pieces);
            let mut reader = ChunkedReader::new(&wire[..]);
            assert_eq!(&reader.read_to_end().await.unwrap()[..], &body[..], "threshold {threshold}");
        }
    }

    #[tokio::test]
    async fn test_read_spans_chunks() {
        let wire = encode(0, &[b"ab", b"cd", b"ef"]);
        let mut reader = ChunkedReader::new(&wire[..]);

        assert_eq!(&reader.read(3).await.unwrap()[..], b"abc");
        assert_eq!(&reader.read(2).await.unwrap()[..], b"de");
        // short read at the end of the body
        assert_eq!(&reader.read(10).await.unwrap()[..], b"f");
        assert!(reader.is_eof());
        assert!(reader.read(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_chunk_keeps_framing() {
        let wire = encode(0, &[b"hello", b", world"]);
        let mut reader = ChunkedReader::new(&wire[..]);

        assert_eq!(&reader.read_chunk().await.unwrap()[..], b"hello");
        assert_eq!(&reader.read_chunk().await.unwrap()[..], b", world");
        assert!(reader.read_chunk().await.unwrap().is_empty());
        assert!(reader.is_eof());
    }

    #[tokio::test]
    async fn test_carry_over_served_by_read_chunk() {
        let wire = encode(0, &[b"hello", b"world"]);
        let mut reader = ChunkedReader::new(&wire[..]);

        assert_eq!(&reader.read(2).await.unwrap()[..], b"he");
        assert_eq!(&reader.read_chunk().await.unwrap()[..], b"llo");
        assert_eq!(&reader.read_chunk().await.unwrap()[..], b"world");
    }

    #[tokio::test]
    async fn test_data_split_across_socket_reads() {
        let (mut client, server) = tokio::io::duplex(8);
        let writer = tokio::spawn(async move {
            for piece in [&b"1"[..], b"a\r\nabcdefghijk", b"lmnopqrstuvwxyz\r", b"\n0\r\n", b"\r\n"] {
                client.write_all(piece).await.unwrap();
            }
        });

        let mut reader = ChunkedReader::new(server);
        assert_eq!(&reader.read_to_end().await.unwrap()[..], b"abcdefghijklmnopqrstuvwxyz");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_truncated_body_is_unexpected_eof() {
        let mut reader = ChunkedReader::new(&b"5\r\nhel"[..]);

        match reader.read_to_end().await {
            Err(ParseError::Io { source }) => assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_crlf_is_malformed() {
        let mut reader = ChunkedReader::new(&b"3\r\nabcX\r\n0\r\n\r\n"[..]);
        assert!(reader.read_chunk().await.unwrap_err().is_malformed_chunk());
    }

    #[tokio::test]
    async fn test_read_after_close() {
        let wire = encode(0, &[b"data"]);
        let mut reader = ChunkedReader::new(&wire[..]);
        reader.close();

        assert!(matches!(reader.read(1).await, Err(ParseError::ClosedStream)));
        assert!(matches!(reader.read_chunk().await, Err(ParseError::ClosedStream)));
    }

    #[tokio::test]
    async fn test_leftover_returned_by_into_inner() {
        let mut wire = encode(0, &[b"body"]);
        wire.extend_from_slice(b"GET / HTTP/1.1\r\n");

        let mut reader = ChunkedReader::with_buffer(&b""[..], wire);
        assert_eq!(&reader.read_to_end().await.unwrap()[..], b"body");

        let (_, rest) = reader.into_inner();
        assert_eq!(&rest[..], b"GET / HTTP/1.1\r\n");
    }
}
