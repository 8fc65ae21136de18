use std::fmt::Display;
use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use ferry_http::connection::{ConnectionConfig, HttpConnection};
use ferry_http::handler::Handler;
use ferry_http::protocol::body::ReqBody;
use http_body::Body;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;

#[derive(Debug)]
pub struct ServerBuilder<H> {
    bind: Option<String>,
    connection: ConnectionConfig,
    handler: Option<H>,
}

impl<H> ServerBuilder<H> {
    fn new() -> Self {
        Self { bind: None, connection: ConnectionConfig::default(), handler: None }
    }

    /// Takes the bind address and connection settings from `config`.
    pub fn config(mut self, config: &ServerConfig) -> Self {
        self.bind = Some(config.bind.clone());
        self.connection = config.connection();
        self
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.bind = Some(address.to_string());
        self
    }

    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<Server<H>, ServerBuildError> {
        let bind = self.bind.ok_or(ServerBuildError::MissingAddress)?;
        let address = bind.parse().map_err(|source| ServerBuildError::InvalidAddress { address: bind, source })?;
        let handler = self.handler.ok_or(ServerBuildError::MissingHandler)?;
        Ok(Server { address, connection: self.connection, handler: Arc::new(handler) })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("handler must be set")]
    MissingHandler,
    #[error("address must be set")]
    MissingAddress,
    #[error("invalid address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },
}

#[derive(Debug)]
pub struct Server<H> {
    address: SocketAddr,
    connection: ConnectionConfig,
    handler: Arc<H>,
}

impl<H> Server<H>
where
    H: Handler<ReqBody> + 'static,
    H::Error: Send,
    H::RespBody: Body<Data = Bytes> + Unpin + Send,
    <H::RespBody as Body>::Error: Display + Send,
{
    pub fn builder() -> ServerBuilder<H> {
        ServerBuilder::new()
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Binds the configured address and serves until the listener fails.
    pub async fn start(self) -> io::Result<()> {
        let listener = match TcpListener::bind(self.address).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(address = %self.address, cause = %e, "bind server error");
                return Err(e);
            }
        };
        self.serve(listener).await
    }

    /// Accepts connections from an already bound listener, one task per connection.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        info!(address = %listener.local_addr()?, "start listening");

        loop {
            let (tcp_stream, remote_addr) = match listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            if let Err(e) = tcp_stream.set_nodelay(true) {
                debug!(cause = %e, "failed to set TCP_NODELAY");
            }

            let handler = Arc::clone(&self.handler);
            let config = self.connection;

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::with_config(reader, writer, config);
                match connection.process(handler).await {
                    Ok(()) => {
                        debug!(remote = %remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(remote = %remote_addr, cause = %e, "connection failed");
                    }
                }
            });
        }
    }
}
