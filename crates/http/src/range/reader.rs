use std::io;
use std::io::SeekFrom;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::trace;

use super::ResolvedRange;

/// Reads the window `[start, end]` of a seekable source.
///
/// Positions are logical: position 0 is `start` in the source. The source position is
/// checked before every read and seek, and restored when someone else moved it.
///
/// Without an end the window runs to the end of the source; its length becomes known
/// once a read hits the end.
#[derive(Debug)]
pub struct RangeReader<R> {
    source: R,
    start: u64,
    /// absolute offset one past the last readable byte
    limit: Option<u64>,
    position: u64,
}

impl<R> RangeReader<R>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    /// `end` is inclusive; `None` reads to the end of the source.
    pub fn new(source: R, start: u64, end: Option<u64>) -> Self {
        let limit = end.map(|end| end.saturating_add(1).max(start));
        Self { source, start, limit, position: 0 }
    }

    pub fn for_range(source: R, range: &ResolvedRange) -> Self {
        Self::new(source, range.start(), Some(range.end()))
    }

    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Length of the window, `None` while the end is still unknown.
    pub fn len(&self) -> Option<u64> {
        self.limit.map(|limit| limit - self.start)
    }

    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Moves to logical `position`, never past one byte after the end.
    pub async fn seek(&mut self, position: u64) -> io::Result<u64> {
        let mut target = self.start.saturating_add(position);
        if let Some(limit) = self.limit {
            target = target.min(limit);
        }

        let actual = self.source.seek(SeekFrom::Start(target)).await?;
        self.position = actual.saturating_sub(self.start);
        Ok(self.position)
    }

    /// Reads at most `n` bytes. A short result means the window, or the source, ended.
    pub async fn read(&mut self, n: usize) -> io::Result<Bytes> {
        self.fix_position().await?;

        let wanted = match self.limit {
            Some(_) => n.min(usize::try_from(self.remaining()).unwrap_or(usize::MAX)),
            None => n,
        };
        if wanted == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = Vec::with_capacity(wanted);
        (&mut self.source).take(wanted as u64).read_to_end(&mut buf).await?;
        self.position += buf.len() as u64;

        if buf.len() < wanted {
            // the source ended inside the window
            self.freeze_end();
        }
        Ok(Bytes::from(buf))
    }

    /// Reads the rest of the window.
    pub async fn read_to_end(&mut self) -> io::Result<Bytes> {
        if self.limit.is_some() {
            let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
            return self.read(remaining).await;
        }

        self.fix_position().await?;
        let mut buf = Vec::new();
        self.source.read_to_end(&mut buf).await?;
        self.position += buf.len() as u64;
        self.freeze_end();

        Ok(Bytes::from(buf))
    }

    fn remaining(&self) -> u64 {
        self.limit.map_or(u64::MAX, |limit| limit.saturating_sub(self.start + self.position))
    }

    fn freeze_end(&mut self) {
        let end = self.start + self.position;
        trace!(end, "range end discovered");
        self.limit = Some(end);
    }

    async fn fix_position(&mut self) -> io::Result<()> {
        let expected = self.start + self.position;
        let actual = self.source.stream_position().await?;
        if actual != expected {
            trace!(expected, actual, "source moved, seek back");
            self.seek(self.position).await?;
        }
        Ok(())
    }
}
