use http::{HeaderName, HeaderValue, header};

use crate::protocol::PayloadSize;

/// How one response body goes on the wire.
///
/// Built by the [`EncodingNegotiator`](super::EncodingNegotiator). The derived flags
/// always satisfy `use_chunked == use_gzip || content_length.is_none()`, except for
/// bodiless responses, which use neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingDecision {
    content_length: Option<u64>,
    accepts_gzip: bool,
    close_connection: bool,
    use_gzip: bool,
    use_chunked: bool,
    bodiless: bool,
}

impl EncodingDecision {
    pub(crate) fn new(content_length: Option<u64>, accepts_gzip: bool, use_gzip: bool, close_connection: bool) -> Self {
        Self {
            content_length,
            accepts_gzip,
            close_connection,
            use_gzip,
            use_chunked: use_gzip || content_length.is_none(),
            bodiless: false,
        }
    }

    /// Decision for a response without a body: HEAD requests and 1xx/204/304 statuses.
    ///
    /// `content_length` is repeated as a header when given, which is how a HEAD
    /// response reports the size of the entity it describes.
    pub fn bodiless(content_length: Option<u64>, close_connection: bool) -> Self {
        Self {
            content_length,
            accepts_gzip: false,
            close_connection,
            use_gzip: false,
            use_chunked: false,
            bodiless: true,
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn accepts_gzip(&self) -> bool {
        self.accepts_gzip
    }

    pub fn use_gzip(&self) -> bool {
        self.use_gzip
    }

    pub fn use_chunked(&self) -> bool {
        self.use_chunked
    }

    pub fn is_bodiless(&self) -> bool {
        self.bodiless
    }

    pub fn close_connection(&self) -> bool {
        self.close_connection
    }

    /// Value of the `Connection` header.
    pub fn connection(&self) -> &'static str {
        if self.close_connection { "close" } else { "keep-alive" }
    }

    /// Framing of the bytes the pipeline hands to the socket.
    pub fn payload_size(&self) -> PayloadSize {
        if self.bodiless {
            return PayloadSize::new_empty();
        }
        match self.content_length {
            _ if self.use_chunked => PayloadSize::new_chunked(),
            Some(length) => PayloadSize::new_length(length),
            None => PayloadSize::new_chunked(),
        }
    }

    /// The headers this decision controls, in emission order:
    /// `Content-Encoding`, `Connection`, `Content-Length`, `Transfer-Encoding`.
    pub fn headers(&self) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = Vec::with_capacity(4);

        if self.use_gzip {
            headers.push((header::CONTENT_ENCODING, HeaderValue::from_static("gzip")));
        }

        headers.push((header::CONNECTION, HeaderValue::from_static(self.connection())));

        if let Some(length) = self.content_length
            && !self.use_gzip
        {
            headers.push((header::CONTENT_LENGTH, HeaderValue::from(length)));
        }

        if self.use_chunked {
            headers.push((header::TRANSFER_ENCODING, HeaderValue::from_static("chunked")));
        }

        headers
    }
}
