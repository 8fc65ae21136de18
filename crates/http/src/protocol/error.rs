use std::io;
use thiserror::Error;

use crate::protocol::ResponseState;
use crate::tunnel::TunnelError;

/// Connection-fatal failure, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to read request: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to send response: {0}")]
    Send(#[from] SendError),

    #[error("tunnel failed: {0}")]
    Tunnel(#[from] TunnelError),
}

/// Errors on the inbound side: request heads and body framing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request head is {current_size} bytes, limit is {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("request has more than {max_num} headers")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("unsupported http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid request uri")]
    InvalidUri,

    #[error("invalid content-length: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    /// Bad hex size or missing CRLF. The message can't be resynchronized.
    #[error("malformed chunk: {reason}")]
    MalformedChunk { reason: String },

    #[error("read from a closed stream")]
    ClosedStream,

    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn malformed_chunk<S: ToString>(reason: S) -> Self {
        Self::MalformedChunk { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn is_malformed_chunk(&self) -> bool {
        matches!(self, Self::MalformedChunk { .. })
    }
}

/// Errors on the outbound side: response framing and the response lifecycle.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    /// Raised for any transition [`ResponseState`] does not allow.
    #[error("write to a closed stream in state {state:?}")]
    ClosedStream { state: ResponseState },

    #[error("body exceeds declared content-length {declared}")]
    BodyTooLong { declared: u64 },

    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn closed_stream(state: ResponseState) -> Self {
        Self::ClosedStream { state }
    }

    pub fn is_closed_stream(&self) -> bool {
        matches!(self, Self::ClosedStream { .. })
    }
}
