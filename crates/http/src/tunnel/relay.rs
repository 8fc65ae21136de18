use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::TunnelError;

/// Bytes read per direction per wakeup.
pub const DEFAULT_RELAY_BUFFER_SIZE: usize = 1024;

/// Which leg of a tunnel ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySide {
    Client,
    Upstream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub client_to_upstream: u64,
    pub upstream_to_client: u64,
    pub closed_by: RelaySide,
}

/// Pumps bytes both ways between a client and an upstream until either closes.
///
/// Each direction runs its own read-then-write loop, so a leg that is slow to read
/// only stalls the direction feeding it. At most one buffer per direction is in
/// flight. When either leg reads end of stream, or any read or write fails, both
/// write halves are shut down before [`run`](Self::run) returns.
#[derive(Debug, Clone, Copy)]
pub struct TunnelRelay {
    buffer_size: usize,
}

impl Default for TunnelRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelRelay {
    pub fn new() -> Self {
        Self { buffer_size: DEFAULT_RELAY_BUFFER_SIZE }
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self { buffer_size: buffer_size.max(1) }
    }

    pub async fn run<CR, CW, U>(&self, client_reader: CR, client_writer: CW, upstream: U) -> Result<RelayStats, TunnelError>
    where
        CR: AsyncRead + Unpin,
        CW: AsyncWrite + Unpin,
        U: AsyncRead + AsyncWrite + Unpin,
    {
        self.run_with_prefix(&[], client_reader, client_writer, upstream).await
    }

    /// Like [`run`](Self::run), first forwarding `prefix`: client bytes that were
    /// already read off the socket while decoding the CONNECT request.
    pub async fn run_with_prefix<CR, CW, U>(
        &self,
        prefix: &[u8],
        mut client_reader: CR,
        mut client_writer: CW,
        upstream: U,
    ) -> Result<RelayStats, TunnelError>
    where
        CR: AsyncRead + Unpin,
        CW: AsyncWrite + Unpin,
        U: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut upstream_reader, mut upstream_writer) = tokio::io::split(upstream);
        let mut client_to_upstream = 0u64;
        let mut upstream_to_client = 0u64;

        let result = tokio::select! {
            closed = pump(&mut client_reader, &mut upstream_writer, prefix, self.buffer_size, &mut client_to_upstream, RelaySide::Client) => closed,
            closed = pump(&mut upstream_reader, &mut client_writer, &[], self.buffer_size, &mut upstream_to_client, RelaySide::Upstream) => closed,
        };

        if let Err(e) = client_writer.shutdown().await {
            debug!(cause = %e, "shutdown client leg of tunnel");
        }
        if let Err(e) = upstream_writer.shutdown().await {
            debug!(cause = %e, "shutdown upstream leg of tunnel");
        }

        let closed_by = result?;
        debug!(client_to_upstream, upstream_to_client, closed_by = ?closed_by, "tunnel closed");
        Ok(RelayStats { client_to_upstream, upstream_to_client, closed_by })
    }
}

/// Copies `reader` into `writer` until `reader` ends, returning `side` on end of stream.
async fn pump<R, W>(
    reader: &mut R,
    writer: &mut W,
    prefix: &[u8],
    buffer_size: usize,
    copied: &mut u64,
    side: RelaySide,
) -> std::io::Result<RelaySide>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if !prefix.is_empty() {
        writer.write_all(prefix).await?;
        writer.flush().await?;
        *copied += prefix.len() as u64;
    }

    let mut buf = vec![0u8; buffer_size];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(side);
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        *copied += n as u64;
        trace!(len = n, from = ?side, "relayed");
    }
}
