use bytes::{Buf, Bytes};

/// One item decoded from the request stream: the head of a new request, or a
/// piece of the current request's body.
#[derive(Debug)]
pub enum Message<T> {
    Header(T),
    Payload(PayloadItem),
}

impl<T> Message<T> {
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

/// Body data flowing out of a payload decoder or into a body encoder.
///
/// `Eof` closes the body; for chunked framing it is what emits the terminal chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<D: Buf = Bytes> {
    Chunk(D),
    Eof,
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    pub fn as_bytes(&self) -> Option<&D> {
        match self {
            PayloadItem::Chunk(data) => Some(data),
            PayloadItem::Eof => None,
        }
    }
}

/// Body delimitation, for request bodies on the way in and responses on the way out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    Length(u64),
    Chunked,
    Empty,
}

impl PayloadSize {
    /// A zero length collapses to [`PayloadSize::Empty`].
    #[inline]
    pub fn new_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    #[inline]
    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    #[inline]
    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}
