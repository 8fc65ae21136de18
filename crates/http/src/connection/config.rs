use crate::negotiate::EncodingConfig;
use crate::tunnel::DEFAULT_RELAY_BUFFER_SIZE;

const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Per connection settings, shared by every connection of a server.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    /// serve more than one request per connection
    pub keep_alive: bool,
    pub encoding: EncodingConfig,
    pub read_buffer_size: usize,
    pub relay_buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            encoding: EncodingConfig::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            relay_buffer_size: DEFAULT_RELAY_BUFFER_SIZE,
        }
    }
}

impl ConnectionConfig {
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn with_relay_buffer_size(mut self, size: usize) -> Self {
        self.relay_buffer_size = size.max(1);
        self
    }
}
