//! Request head decoding.
//!
//! Parses the request line and header fields with `httparse`, then converts them into a
//! [`RequestHeader`] without copying header values: the head is split off the read
//! buffer once and every value is a slice of it. The `Content-Length` and
//! `Transfer-Encoding` fields select the [`PayloadSize`] of the body that follows.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Request};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

const MAX_HEADER_NUM: usize = 64;

const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for request heads, yielding the header and the size of the body after it.
#[derive(Debug, Default)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // shortest possible head is "GET / HTTP/1.1\r\n\r\n"
        if src.len() < 14 {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_result = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(head_size = body_offset, "parsed request head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let header_count = req.headers.len();
                let mut header_index = [HeaderIndex::EMPTY; MAX_HEADER_NUM];
                HeaderIndex::record(src, req.headers, &mut header_index);

                let version = match req.version {
                    Some(0) => http::Version::HTTP_10,
                    Some(1) => http::Version::HTTP_11,
                    _ => return Err(ParseError::InvalidVersion(req.version)),
                };

                let method = req.method.ok_or(ParseError::InvalidMethod)?;
                let method = http::Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
                let uri = req.path.ok_or(ParseError::InvalidUri)?;
                let uri = uri.parse::<http::Uri>().map_err(|_| ParseError::InvalidUri)?;

                let mut request = Request::new(());
                *request.method_mut() = method;
                *request.uri_mut() = uri;
                *request.version_mut() = version;

                let header_bytes = src.split_to(body_offset).freeze();
                let headers = request.headers_mut();
                headers.reserve(header_count);
                for index in &header_index[..header_count] {
                    let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1])
                        .map_err(ParseError::invalid_header)?;
                    let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                        .map_err(ParseError::invalid_header)?;
                    headers.append(name, value);
                }

                let header = RequestHeader::from(request);
                let payload_size = parse_payload(&header)?;

                Ok(Some((header, payload_size)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Byte ranges of a header's name and value inside the read buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

impl HeaderIndex {
    const EMPTY: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, index) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            index.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            index.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Selects the body framing of a request (RFC 9112 §6.3).
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    if !header.need_body() {
        return Ok(PayloadSize::new_empty());
    }

    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (Some(te_value), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::new_chunked())
            } else {
                Err(ParseError::invalid_header("transfer-encoding without chunked as final coding"))
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value is not visible ascii"))?;

            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer-encoding and content-length both present")),
    }
}

/// Chunked must be the final coding when present.
fn is_chunked(value: &HeaderValue) -> bool {
    value.as_bytes().rsplit(|b| *b == b',').next().is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Version};
    use indoc::indoc;

    #[test]
    fn check_is_chunked() {
        assert!(is_chunked(&HeaderValue::from_static("gzip, chunked")));
        assert!(is_chunked(&HeaderValue::from_static("Chunked")));
        assert!(!is_chunked(&HeaderValue::from_static("chunked, gzip")));
        assert!(!is_chunked(&HeaderValue::from_static("gzip")));
    }

    #[test]
    fn test_body_left_in_buffer() {
        let str = indoc! {r"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        123"};

        let mut bytes = BytesMut::from(str);
        let result = HeaderDecoder.decode(&mut bytes).unwrap();

        assert!(result.is_some());
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "};

        let mut buf = BytesMut::from(str);
        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());
        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), None);
        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(http::header::HOST).unwrap(), "127.0.0.1:8080");
        assert_eq!(header.headers().get(http::header::USER_AGENT).unwrap(), "curl/7.79.1");
    }

    #[test]
    fn partial_head_needs_more() {
        let mut buf = BytesMut::from("GET /index.html HTTP/1.1\r\nHost: 127.0.0.1\r\n");
        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\r\n");
        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn chunked_post() {
        let mut buf = BytesMut::from("POST /upload HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n");
        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.method(), &Method::POST);
        assert!(payload_size.is_chunked());
        assert_eq!(&buf[..], b"5\r\nhello\r\n0\r\n\r\n");
    }

    #[test]
    fn content_length_post() {
        let mut buf = BytesMut::from("POST /form HTTP/1.0\r\nContent-Length: 4\r\n\r\na=bc");
        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.version(), Version::HTTP_10);
        assert_eq!(payload_size, PayloadSize::Length(4));
    }

    #[test]
    fn conflicting_length_headers() {
        let mut buf =
            BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 4\r\nTransfer-Encoding: chunked\r\n\r\n");
        assert!(HeaderDecoder.decode(&mut buf).is_err());
    }

    #[test]
    fn connect_authority_form() {
        let mut buf = BytesMut::from("CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n");
        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.method(), &Method::CONNECT);
        assert_eq!(header.uri().authority().unwrap().as_str(), "example.com:443");
        assert!(payload_size.is_empty());
    }

    #[test]
    fn proxy_absolute_form() {
        let mut buf = BytesMut::from("GET http://example.com/a?b=c HTTP/1.1\r\nHost: example.com\r\n\r\n");
        let (header, _) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.uri().scheme_str(), Some("http"));
        assert_eq!(header.uri().host(), Some("example.com"));
        assert_eq!(header.uri().path(), "/a");
    }

    #[test]
    fn too_large_head() {
        let mut head = String::from("GET / HTTP/1.1\r\n");
        head.push_str(&format!("X-Big: {}\r\n", "a".repeat(9 * 1024)));
        let mut buf = BytesMut::from(head.as_str());

        assert!(matches!(HeaderDecoder.decode(&mut buf), Err(ParseError::TooLargeHeader { .. })));
    }
}
