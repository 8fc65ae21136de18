use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::trace;

use super::compress::Gzip;
use crate::codec::PayloadEncoder;
use crate::negotiate::{EncodingConfig, EncodingDecision};
use crate::protocol::{PayloadItem, ResponseState, SendError};

/// Builds the stages of one response body.
#[derive(Debug)]
pub struct TransferPipeline;

impl TransferPipeline {
    /// Builds the stages `decision` asks for, innermost first: the framing for the
    /// socket, then gzip on top of it.
    pub fn begin(decision: &EncodingDecision, config: &EncodingConfig) -> BodyEncoder {
        let framing = PayloadEncoder::for_size(decision.payload_size(), config.chunk_threshold);
        let gzip = decision.use_gzip().then(|| Gzip::new(config.compression_level));

        trace!(chunked = framing.is_chunked(), gzip = gzip.is_some(), "begin response body");
        BodyEncoder { gzip, framing, written: 0, finished: false }
    }
}

/// The outermost stage of a response body; every body byte goes through it.
///
/// Encoded output is appended to a caller supplied `BytesMut` which the connection
/// then writes to the socket. A body must be ended with [`finish`](Self::finish),
/// which also produces the gzip trailer and the last chunk.
#[derive(Debug)]
pub struct BodyEncoder {
    gzip: Option<Gzip>,
    framing: PayloadEncoder,
    written: u64,
    finished: bool,
}

impl BodyEncoder {
    pub fn write(&mut self, data: &[u8], dst: &mut BytesMut) -> Result<usize, SendError> {
        self.ensure_open()?;

        match &mut self.gzip {
            Some(gzip) => {
                let compressed = gzip.write(data)?;
                self.framing.write(&compressed, dst)?;
            }
            None => {
                self.framing.write(data, dst)?;
            }
        }

        self.written += data.len() as u64;
        Ok(data.len())
    }

    /// Pushes everything written so far out of the stages without ending the body.
    pub fn flush(&mut self, dst: &mut BytesMut) -> Result<(), SendError> {
        self.ensure_open()?;

        if let Some(gzip) = &mut self.gzip {
            let compressed = gzip.flush()?;
            self.framing.write(&compressed, dst)?;
        }
        self.framing.flush(dst)
    }

    /// Closes the stages outer to inner.
    pub fn finish(&mut self, dst: &mut BytesMut) -> Result<(), SendError> {
        self.ensure_open()?;
        self.finished = true;

        if let Some(gzip) = &mut self.gzip {
            let tail = gzip.finish()?;
            self.framing.write(&tail, dst)?;
        }
        self.framing.finish(dst)?;

        trace!(written = self.written, "finished response body");
        Ok(())
    }

    pub fn is_finish(&self) -> bool {
        self.finished
    }

    pub fn is_chunked(&self) -> bool {
        self.framing.is_chunked()
    }

    pub fn is_gzip(&self) -> bool {
        self.gzip.is_some()
    }

    /// Body bytes accepted so far, before compression and framing.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn ensure_open(&self) -> Result<(), SendError> {
        if self.finished { Err(SendError::closed_stream(ResponseState::BodyClosed)) } else { Ok(()) }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for BodyEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(mut bytes) => {
                while bytes.has_remaining() {
                    let len = self.write(bytes.chunk(), dst)?;
                    bytes.advance(len);
                }
                Ok(())
            }
            PayloadItem::Eof => self.finish(dst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ChunkedReader;
    use bytes::Bytes;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn decision(content_length: Option<u64>, gzip: bool) -> EncodingDecision {
        EncodingDecision::new(content_length, gzip, gzip, false)
    }

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_plain_known_length_passes_through() {
        let mut body = TransferPipeline::begin(&decision(Some(11), false), &EncodingConfig::default());
        let mut dst = BytesMut::new();

        body.write(b"hello ", &mut dst).unwrap();
        body.write(b"world", &mut dst).unwrap();
        body.finish(&mut dst).unwrap();

        assert!(!body.is_chunked());
        assert_eq!(&dst[..], b"hello world");
        assert_eq!(body.written(), 11);
    }

    #[test]
    fn test_known_length_is_enforced() {
        let mut body = TransferPipeline::begin(&decision(Some(4), false), &EncodingConfig::default());
        let mut dst = BytesMut::new();

        body.write(b"abc", &mut dst).unwrap();
        let error = body.write(b"de", &mut dst).unwrap_err();
        assert!(matches!(error, SendError::BodyTooLong { declared: 4 }));
    }

    #[test]
    fn test_unknown_length_is_chunked() {
        let mut body = TransferPipeline::begin(&decision(None, false), &EncodingConfig::default());
        let mut dst = BytesMut::new();

        body.write(b"hello", &mut dst).unwrap();
        body.write(b", world", &mut dst).unwrap();
        body.finish(&mut dst).unwrap();

        assert_eq!(&dst[..], b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n");
    }

    #[test]
    fn test_threshold_from_config() {
        let config = EncodingConfig::default().with_chunk_threshold(10);
        let mut body = TransferPipeline::begin(&decision(None, false), &config);
        let mut dst = BytesMut::new();

        body.write(b"abcdefghijklmnopqrstuvwxyz", &mut dst).unwrap();
        body.write(b"ABCDE", &mut dst).unwrap();
        body.flush(&mut dst).unwrap();
        body.finish(&mut dst).unwrap();

        assert_eq!(&dst[..], &b"1a\r\nabcdefghijklmnopqrstuvwxyz\r\n5\r\nABCDE\r\n0\r\n\r\n"[..]);
    }

    #[tokio::test]
    async fn test_gzip_chunked_round_trip() {
        let config = EncodingConfig::default().with_gzip(true);
        let mut body = TransferPipeline::begin(&decision(Some(4000), true), &config);
        let mut dst = BytesMut::new();

        let input: Vec<u8> = b"the quick brown fox jumps over the lazy dog ".iter().copied().cycle().take(4000).collect();
        for piece in input.chunks(512) {
            body.write(piece, &mut dst).unwrap();
        }
        body.finish(&mut dst).unwrap();

        assert!(body.is_gzip());
        assert!(body.is_chunked());
        assert!(dst.ends_with(b"\r\n0\r\n\r\n"));

        let compressed = ChunkedReader::new(&dst[..]).read_to_end().await.unwrap();
        assert_eq!(gunzip(&compressed), input);
    }

    #[tokio::test]
    async fn test_gzip_flush_frames_partial_output() {
        let config = EncodingConfig::default().with_gzip(true);
        let mut body = TransferPipeline::begin(&decision(None, true), &config);
        let mut dst = BytesMut::new();

        body.write(b"streamed", &mut dst).unwrap();
        body.flush(&mut dst).unwrap();
        assert!(!dst.is_empty());

        body.finish(&mut dst).unwrap();
        let compressed = ChunkedReader::new(&dst[..]).read_to_end().await.unwrap();
        assert_eq!(gunzip(&compressed), b"streamed");
    }

    #[test]
    fn test_bodiless_accepts_nothing() {
        let mut body = TransferPipeline::begin(&EncodingDecision::bodiless(Some(10), false), &EncodingConfig::default());
        let mut dst = BytesMut::new();

        assert!(body.write(b"x", &mut dst).is_err());
        body.finish(&mut dst).unwrap();
        assert!(dst.is_empty());
    }

    #[test]
    fn test_use_after_finish() {
        let mut body = TransferPipeline::begin(&decision(None, false), &EncodingConfig::default());
        let mut dst = BytesMut::new();

        body.encode(PayloadItem::Chunk(Bytes::from_static(b"ok")), &mut dst).unwrap();
        body.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert!(body.is_finish());
        assert!(body.write(b"late", &mut dst).unwrap_err().is_closed_stream());
        assert!(body.finish(&mut dst).unwrap_err().is_closed_stream());
    }
}
