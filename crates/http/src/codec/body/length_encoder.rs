//! Pass-through encoder for bodies with a declared `Content-Length`.
//!
//! Bytes are copied unchanged. The encoder refuses to write more than the declared
//! length, and finishing before the declared length was reached is an error, since
//! the peer would otherwise wait for bytes that never come.

use crate::protocol::{PayloadItem, ResponseState, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    declared: u64,
    remaining: u64,
    finished: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { declared: length, remaining: length, finished: false }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_finish(&self) -> bool {
        self.finished
    }

    pub fn write(&mut self, data: &[u8], dst: &mut BytesMut) -> Result<usize, SendError> {
        if self.finished {
            return Err(SendError::closed_stream(ResponseState::BodyClosed));
        }

        if data.len() as u64 > self.remaining {
            warn!(declared = self.declared, remaining = self.remaining, len = data.len(), "body exceeds content-length");
            return Err(SendError::BodyTooLong { declared: self.declared });
        }

        dst.extend_from_slice(data);
        self.remaining -= data.len() as u64;
        Ok(data.len())
    }

    pub fn finish(&mut self) -> Result<(), SendError> {
        if self.finished {
            return Err(SendError::closed_stream(ResponseState::BodyClosed));
        }
        self.finished = true;

        if self.remaining > 0 {
            return Err(SendError::invalid_body(format!(
                "body ended {} bytes short of content-length {}",
                self.remaining, self.declared
            )));
        }
        Ok(())
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
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
            PayloadItem::Eof => self.finish(),
        }
    }
}
