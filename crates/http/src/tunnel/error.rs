use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("invalid connect target: {target}")]
    InvalidTarget { target: String },

    #[error("connect to upstream {target} failed: {source}")]
    UpstreamConnect {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl TunnelError {
    pub fn invalid_target<S: ToString>(target: S) -> Self {
        Self::InvalidTarget { target: target.to_string() }
    }

    pub fn upstream_connect<S: ToString>(target: S, source: io::Error) -> Self {
        Self::UpstreamConnect { target: target.to_string(), source }
    }

    pub fn is_upstream_connect(&self) -> bool {
        matches!(self, Self::UpstreamConnect { .. })
    }
}
