//! CONNECT tunnels.
//!
//! After a `CONNECT host:port` request the connection stops speaking HTTP and
//! becomes an opaque byte pipe to the upstream host:
//!
//! 1. the handler validates the target with [`ConnectTarget::parse`] and dials it
//!    with [`connect_upstream`]
//! 2. it answers with a response carrying the socket in a [`PendingTunnel`] extension
//! 3. the connection writes `200 Connection Established` and hands both sockets
//!    to [`TunnelRelay::run`], which returns once either side closes

mod error;
mod relay;
mod target;

pub use error::TunnelError;
pub use relay::RelaySide;
pub use relay::RelayStats;
pub use relay::TunnelRelay;
pub use relay::DEFAULT_RELAY_BUFFER_SIZE;
pub use target::ConnectTarget;
pub use target::PendingTunnel;
pub use target::connect_upstream;
