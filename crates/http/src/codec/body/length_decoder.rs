//! Request bodies delimited by `Content-Length`, see
//! [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Yields the next `length` bytes of the stream as body chunks, then [`PayloadItem::Eof`].
///
/// Bytes past the declared length stay in the buffer; they belong to the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Body bytes not decoded yet.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_finish(&self) -> bool {
        self.remaining == 0
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = usize::try_from(self.remaining).map_or(src.len(), |remaining| remaining.min(src.len()));
        let bytes = src.split_to(len).freeze();

        self.remaining -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::invalid_body(format!("connection closed with {} body bytes missing", self.remaining))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_next_request_in_buffer() {
        let mut buffer = BytesMut::from(&b"1012345678GET / HTTP/1.1\r\n"[..]);
        let mut decoder = LengthDecoder::new(10);

        let payload = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(payload.as_bytes().map(|b| &b[..]), Some(&b"1012345678"[..]));
        assert!(decoder.is_finish());
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn test_body_split_across_reads() {
        let mut decoder = LengthDecoder::new(6);

        let mut buffer = BytesMut::from(&b"abc"[..]);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Chunk("abc".into())));
        assert_eq!(decoder.remaining(), 3);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"def");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Chunk("def".into())));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn test_truncated_body() {
        let mut decoder = LengthDecoder::new(6);
        let mut buffer = BytesMut::from(&b"abc"[..]);

        assert!(decoder.decode_eof(&mut buffer).unwrap().is_some());
        assert!(matches!(decoder.decode_eof(&mut buffer), Err(ParseError::InvalidBody { .. })));
    }
}
