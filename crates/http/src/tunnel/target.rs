use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use super::TunnelError;

/// The `host:port` request-target of a CONNECT request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    host: String,
    port: u16,
}

impl ConnectTarget {
    /// Parses `host:port`; IPv6 literals must be bracketed, as in `[::1]:443`.
    pub fn parse(value: &str) -> Result<Self, TunnelError> {
        let value = value.trim();
        let (host, port) = value.rsplit_once(':').ok_or_else(|| TunnelError::invalid_target(value))?;

        let host = match host.strip_prefix('[') {
            Some(inner) => inner.strip_suffix(']').ok_or_else(|| TunnelError::invalid_target(value))?,
            None if host.contains(':') => return Err(TunnelError::invalid_target(value)),
            None => host,
        };
        if host.is_empty() {
            return Err(TunnelError::invalid_target(value));
        }

        let port = port.parse::<u16>().map_err(|_| TunnelError::invalid_target(value))?;
        if port == 0 {
            return Err(TunnelError::invalid_target(value));
        }

        Ok(Self { host: host.to_owned(), port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') { write!(f, "[{}]:{}", self.host, self.port) } else { write!(f, "{}:{}", self.host, self.port) }
    }
}

/// Dials `target`, giving up after `timeout`.
pub async fn connect_upstream(target: &ConnectTarget, timeout: Duration) -> Result<TcpStream, TunnelError> {
    let connect = TcpStream::connect((target.host(), target.port()));
    let stream = match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(TunnelError::upstream_connect(target, e)),
        Err(_) => {
            let e = io::Error::new(io::ErrorKind::TimedOut, format!("no connection after {timeout:?}"));
            return Err(TunnelError::upstream_connect(target, e));
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        debug!(upstream = %target, cause = %e, "failed to set TCP_NODELAY on upstream stream");
    }
    debug!(upstream = %target, "connected to upstream");
    Ok(stream)
}

/// An upstream socket waiting for the connection to switch into tunnel mode.
///
/// Travels as a response extension from the handler to the connection, which takes
/// the socket out exactly once.
#[derive(Debug, Clone)]
pub struct PendingTunnel {
    upstream: Arc<Mutex<Option<TcpStream>>>,
}

impl PendingTunnel {
    pub fn new(upstream: TcpStream) -> Self {
        Self { upstream: Arc::new(Mutex::new(Some(upstream))) }
    }

    pub fn take(&self) -> Option<TcpStream> {
        self.upstream.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
