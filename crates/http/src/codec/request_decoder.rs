//! Request stream decoding.
//!
//! [`RequestDecoder`] alternates between two phases on one connection buffer: a
//! request head, then the body framed as the head declared, then the next head.
//! Bytes past the end of a body stay in the buffer for the following request.
//!
//! ```
//! use bytes::BytesMut;
//! use ferry_http::codec::RequestDecoder;
//! use ferry_http::protocol::{Message, PayloadItem};
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"POST /upload HTTP/1.1\r\nContent-Length: 2\r\n\r\nok"[..]);
//!
//! assert!(decoder.decode(&mut buffer).unwrap().is_some_and(|m| m.is_header()));
//! assert!(matches!(decoder.decode(&mut buffer).unwrap(), Some(Message::Payload(PayloadItem::Chunk(_)))));
//! assert!(matches!(decoder.decode(&mut buffer).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    /// Set while a body is being decoded.
    body: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the decoder sits between two requests.
    pub fn is_idle(&self) -> bool {
        self.body.is_none()
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(body) = &mut self.body {
            let item = body.decode(src)?;
            if item.as_ref().is_some_and(PayloadItem::is_eof) {
                self.body = None;
            }
            return Ok(item.map(Message::Payload));
        }

        let Some((header, payload_size)) = self.header_decoder.decode(src)? else {
            return Ok(None);
        };
        self.body = Some(payload_size.into());
        Ok(Some(Message::Header((header, payload_size))))
    }
}
