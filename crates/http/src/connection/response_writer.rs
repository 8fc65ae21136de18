use crate::codec::HeaderEncoder;
use crate::negotiate::{EncodingConfig, EncodingDecision};
use crate::pipeline::{BodyEncoder, TransferPipeline};
use crate::protocol::{ResponseHead, ResponseState, SendError};
use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;

/// Buffers one response at a time and tracks where it is in its lifecycle.
///
/// The head and body bytes are encoded into an in-memory buffer, which goes to the
/// socket on [`flush`](Self::flush). Calls out of order fail with
/// [`SendError::ClosedStream`] instead of corrupting the stream.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
    buffer: BytesMut,
    header_encoder: HeaderEncoder,
    body: Option<BodyEncoder>,
    state: ResponseState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), header_encoder: HeaderEncoder, body: None, state: ResponseState::Idle }
    }

    #[inline]
    pub fn state(&self) -> ResponseState {
        self.state
    }

    /// Bytes waiting for the next flush.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Queues bytes that sit outside any response, like `100 Continue` or the
    /// tunnel established line.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        self.state.expect(ResponseState::Idle)?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Encodes the head and sets up the body stages `decision` asks for.
    pub fn write_head(&mut self, head: ResponseHead, decision: EncodingDecision, config: &EncodingConfig) -> Result<(), SendError> {
        self.state.transition(ResponseState::HeadersSent)?;

        let bodiless = decision.is_bodiless();
        let body = TransferPipeline::begin(&decision, config);
        self.header_encoder.encode((head, decision), &mut self.buffer)?;

        if bodiless {
            self.state.transition(ResponseState::BodyClosed)
        } else {
            self.body = Some(body);
            self.state.transition(ResponseState::BodyOpen)
        }
    }

    pub fn write_body(&mut self, data: &[u8]) -> Result<usize, SendError> {
        self.state.expect(ResponseState::BodyOpen)?;
        let state = self.state;
        let body = self.body.as_mut().ok_or_else(|| SendError::closed_stream(state))?;
        body.write(data, &mut self.buffer)
    }

    /// Pushes body bytes still held by the gzip and chunk stages into the buffer,
    /// leaving the body open. Chunked output ends on a chunk boundary.
    pub fn flush_body(&mut self) -> Result<(), SendError> {
        self.state.expect(ResponseState::BodyOpen)?;
        let state = self.state;
        let body = self.body.as_mut().ok_or_else(|| SendError::closed_stream(state))?;
        body.flush(&mut self.buffer)
    }

    /// Ends the body: gzip trailer, last chunk, length check.
    pub fn finish_body(&mut self) -> Result<(), SendError> {
        self.state.expect(ResponseState::BodyOpen)?;
        if let Some(body) = &mut self.body {
            body.finish(&mut self.buffer)?;
        }
        self.state.transition(ResponseState::BodyClosed)
    }

    /// Readies the writer for the next response on the same connection.
    pub fn reset(&mut self) -> Result<(), SendError> {
        self.state.transition(ResponseState::Idle)?;
        self.body = None;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.writer.write_all(self.buffer.as_ref()).await?;
        self.buffer.clear();
        Ok(self.writer.flush().await?)
    }

    pub async fn shutdown(&mut self) -> Result<(), SendError> {
        self.flush().await?;
        Ok(self.writer.shutdown().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Response, StatusCode};
    use crate::negotiate::EncodingNegotiator;

    fn head() -> ResponseHead {
        Response::builder().status(StatusCode::OK).body(()).unwrap()
    }

    #[tokio::test]
    async fn writes_length_delimited_response() {
        let mut writer = ResponseWriter::with_capacity(Vec::new(), 64);
        let decision = EncodingNegotiator::default().decide(&HeaderMap::new(), Some(5), false);

        writer.write_head(head(), decision, &EncodingConfig::default()).unwrap();
        assert_eq!(writer.state(), ResponseState::BodyOpen);
        writer.write_body(b"hello").unwrap();
        writer.finish_body().unwrap();
        writer.flush().await.unwrap();
        writer.reset().unwrap();

        assert_eq!(writer.buffered(), 0);
        assert_eq!(
            writer.into_inner(),
            b"HTTP/1.1 200 OK\r\nconnection: keep-alive\r\ncontent-length: 5\r\n\r\nhello".to_vec()
        );
    }

    #[tokio::test]
    async fn bodiless_response_skips_body_state() {
        let mut writer = ResponseWriter::with_capacity(Vec::new(), 64);

        writer.write_head(head(), EncodingDecision::bodiless(Some(42), true), &EncodingConfig::default()).unwrap();
        assert_eq!(writer.state(), ResponseState::BodyClosed);
        assert!(writer.write_body(b"x").unwrap_err().is_closed_stream());

        writer.flush().await.unwrap();
        assert_eq!(writer.into_inner(), b"HTTP/1.1 200 OK\r\nconnection: close\r\ncontent-length: 42\r\n\r\n".to_vec());
    }

    #[tokio::test]
    async fn flush_body_emits_held_chunk() {
        let mut writer = ResponseWriter::with_capacity(Vec::new(), 64);
        let config = EncodingConfig::default().with_chunk_threshold(1024);
        let decision = EncodingNegotiator::new(config).decide(&HeaderMap::new(), None, false);

        writer.write_head(head(), decision, &config).unwrap();
        writer.write_body(b"tick").unwrap();
        let head_len = writer.buffered();
        writer.flush_body().unwrap();
        assert_eq!(writer.buffered(), head_len + b"4\r\ntick\r\n".len());

        writer.finish_body().unwrap();
        writer.flush().await.unwrap();
        assert!(writer.into_inner().ends_with(b"\r\n\r\n4\r\ntick\r\n0\r\n\r\n"));
    }

    #[test]
    fn out_of_order_calls_fail() {
        let mut writer = ResponseWriter::with_capacity(Vec::new(), 64);

        assert!(writer.write_body(b"early").unwrap_err().is_closed_stream());
        assert!(writer.finish_body().unwrap_err().is_closed_stream());
        assert!(writer.flush_body().unwrap_err().is_closed_stream());
        assert!(writer.reset().unwrap_err().is_closed_stream());

        let decision = EncodingNegotiator::default().decide(&HeaderMap::new(), None, false);
        writer.write_head(head(), decision, &EncodingConfig::default()).unwrap();
        assert!(writer.write_head(head(), decision, &EncodingConfig::default()).unwrap_err().is_closed_stream());
        assert!(writer.write_raw(b"HTTP/1.1 100 Continue\r\n\r\n").unwrap_err().is_closed_stream());
    }
}
