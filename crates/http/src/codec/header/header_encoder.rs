//! Response head encoding.
//!
//! Writes the status line, the handler's header fields and then the fields owned by
//! the [`EncodingDecision`]. Handler supplied `Connection`, `Content-Length` and
//! `Transfer-Encoding` values are replaced by the decision's, as is
//! `Content-Encoding` when the body gets compressed.

use crate::negotiate::EncodingDecision;
use crate::protocol::{ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderName, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

const INIT_HEADER_SIZE: usize = 4 * 1024;

#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, EncodingDecision)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, EncodingDecision), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, decision) = item;

        dst.reserve(INIT_HEADER_SIZE);
        match head.version() {
            // HTTP/1.0 clients get an HTTP/1.1 status line as well
            Version::HTTP_10 | Version::HTTP_11 => {
                let status = head.status();
                write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or(""))?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        for (name, value) in head.headers() {
            if is_managed(name, &decision) {
                continue;
            }
            write_header(dst, name.as_ref(), value.as_ref());
        }

        for (name, value) in decision.headers() {
            write_header(dst, name.as_ref(), value.as_ref());
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

fn is_managed(name: &HeaderName, decision: &EncodingDecision) -> bool {
    name == header::CONNECTION
        || name == header::CONTENT_LENGTH
        || name == header::TRANSFER_ENCODING
        || (decision.use_gzip() && name == header::CONTENT_ENCODING)
}

fn write_header(dst: &mut BytesMut, name: &[u8], value: &[u8]) {
    dst.put_slice(name);
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

/// Writes formatted text straight into the buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiate::{EncodingConfig, EncodingNegotiator};
    use http::{HeaderMap, HeaderValue, Response, StatusCode};

    fn encode(head: ResponseHead, decision: EncodingDecision) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, decision), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn known_length() {
        let head = Response::builder().status(StatusCode::OK).header("Content-Type", "text/plain").body(()).unwrap();
        let decision = EncodingNegotiator::default().decide(&HeaderMap::new(), Some(5), false);

        assert_eq!(
            encode(head, decision),
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\nconnection: keep-alive\r\ncontent-length: 5\r\n\r\n"
        );
    }

    #[test]
    fn handler_framing_headers_are_replaced() {
        let head = Response::builder()
            .status(StatusCode::OK)
            .header("Content-Length", "999")
            .header("Transfer-Encoding", "identity")
            .header("Connection", "keep-alive")
            .body(())
            .unwrap();

        let mut request = HeaderMap::new();
        request.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        let negotiator = EncodingNegotiator::new(EncodingConfig::default().with_gzip(true));
        let decision = negotiator.decide(&request, Some(999), true);

        assert_eq!(
            encode(head, decision),
            "HTTP/1.1 200 OK\r\ncontent-encoding: gzip\r\nconnection: close\r\ntransfer-encoding: chunked\r\n\r\n"
        );
    }

    #[test]
    fn upstream_content_encoding_is_kept() {
        let head = Response::builder().status(StatusCode::OK).header("Content-Encoding", "br").body(()).unwrap();
        let decision = EncodingNegotiator::default().decide(&HeaderMap::new(), None, false);

        assert_eq!(
            encode(head, decision),
            "HTTP/1.1 200 OK\r\ncontent-encoding: br\r\nconnection: keep-alive\r\ntransfer-encoding: chunked\r\n\r\n"
        );
    }

    #[test]
    fn range_response() {
        let head = Response::builder()
            .status(StatusCode::PARTIAL_CONTENT)
            .header("Content-Range", "2-9/10")
            .body(())
            .unwrap();
        let decision = EncodingNegotiator::default().decide(&HeaderMap::new(), Some(8), false);

        assert_eq!(
            encode(head, decision),
            "HTTP/1.1 206 Partial Content\r\ncontent-range: 2-9/10\r\nconnection: keep-alive\r\ncontent-length: 8\r\n\r\n"
        );
    }

    #[test]
    fn not_modified() {
        let head = Response::builder().status(StatusCode::NOT_MODIFIED).body(()).unwrap();
        assert_eq!(encode(head, EncodingDecision::bodiless(None, false)), "HTTP/1.1 304 Not Modified\r\nconnection: keep-alive\r\n\r\n");
    }
}
