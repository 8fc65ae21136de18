use std::io;
use std::io::Write;

use bytes::{Bytes, BytesMut};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::trace;

/// Collects compressor output until the pipeline takes it.
#[derive(Debug)]
pub(crate) struct Writer {
    buf: BytesMut,
}

impl Writer {
    fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// gzip stage of the pipeline.
#[derive(Debug)]
pub(crate) struct Gzip {
    encoder: GzEncoder<Writer>,
    finished: bool,
}

impl Gzip {
    pub(crate) fn new(level: u32) -> Self {
        Self { encoder: GzEncoder::new(Writer::new(), Compression::new(level.min(9))), finished: false }
    }

    /// Compresses `data`, returning whatever output the compressor released.
    pub(crate) fn write(&mut self, data: &[u8]) -> io::Result<Bytes> {
        self.encoder.write_all(data)?;
        Ok(self.encoder.get_mut().take())
    }

    /// Sync-flushes the compressor so every byte written so far can be decoded.
    pub(crate) fn flush(&mut self) -> io::Result<Bytes> {
        self.encoder.flush()?;
        Ok(self.encoder.get_mut().take())
    }

    /// Ends the gzip member, returning the remaining output and the trailer.
    pub(crate) fn finish(&mut self) -> io::Result<Bytes> {
        self.encoder.try_finish()?;
        self.finished = true;
        let bytes = self.encoder.get_mut().take();
        trace!(len = bytes.len(), "finished gzip stream");
        Ok(bytes)
    }

    pub(crate) fn is_finish(&self) -> bool {
        self.finished
    }
}
