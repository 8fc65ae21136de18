//! Framing stage for response bodies.
//!
//! [`PayloadEncoder`] is the stage of the transfer pipeline closest to the socket:
//! it either frames bytes as chunks, copies them under a declared length, or
//! accepts nothing for bodiless responses.

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{PayloadItem, PayloadSize, SendError};
use bytes::{Buf, BytesMut};

use tokio_util::codec::Encoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    NoBody { finished: bool },
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody { finished: false } }
    }

    pub fn chunked(threshold: usize) -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::with_threshold(threshold)) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    /// Picks the framing for `payload_size`, chunking with `threshold`.
    pub fn for_size(payload_size: PayloadSize, threshold: usize) -> Self {
        match payload_size {
            PayloadSize::Length(size) => Self::fix_length(size),
            PayloadSize::Chunked => Self::chunked(threshold),
            PayloadSize::Empty => Self::empty(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody { .. })
    }

    pub fn is_finish(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finish(),
            Kind::Chunked(encoder) => encoder.is_finish(),
            Kind::NoBody { finished } => *finished,
        }
    }

    pub fn write(&mut self, data: &[u8], dst: &mut BytesMut) -> Result<usize, SendError> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.write(data, dst),
            Kind::Chunked(encoder) => encoder.write(data, dst),
            Kind::NoBody { .. } if data.is_empty() => Ok(0),
            Kind::NoBody { .. } => Err(SendError::invalid_body("response must not carry a body")),
        }
    }

    /// Pushes out anything the framing is holding back without ending the body.
    pub fn flush(&mut self, dst: &mut BytesMut) -> Result<(), SendError> {
        match &mut self.kind {
            Kind::Chunked(encoder) => encoder.flush_chunk(dst),
            Kind::Length(_) | Kind::NoBody { .. } => Ok(()),
        }
    }

    pub fn finish(&mut self, dst: &mut BytesMut) -> Result<(), SendError> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.finish(),
            Kind::Chunked(encoder) => encoder.finish(dst),
            Kind::NoBody { finished } => {
                *finished = true;
                Ok(())
            }
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::NoBody { finished } => match item {
                PayloadItem::Chunk(bytes) if bytes.has_remaining() => {
                    Err(SendError::invalid_body("response must not carry a body"))
                }
                PayloadItem::Chunk(_) => Ok(()),
                PayloadItem::Eof => {
                    *finished = true;
                    Ok(())
                }
            },
        }
    }
}
