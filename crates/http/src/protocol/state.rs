//! Lifecycle of a single response on a connection.
//!
//! A response moves strictly forward through its states:
//!
//! ```text
//! Idle ──> HeadersSent ──> BodyOpen ──> BodyClosed ──> (Idle, when the connection is reused)
//!               └───────────────────────────^
//!                  (bodiless: HEAD, 204, 304)
//! ```
//!
//! Any other transition is a misuse of the response writer and is reported as
//! [`SendError::ClosedStream`](crate::protocol::SendError::ClosedStream).

use crate::protocol::SendError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ResponseState {
    /// nothing written for the current response yet
    #[default]
    Idle,
    /// status line and headers are buffered, no body stage exists
    HeadersSent,
    /// the transfer pipeline is built and accepting body bytes
    BodyOpen,
    /// the body (if any) is terminated; only a reset may follow
    BodyClosed,
}

impl ResponseState {
    /// Moves to `next`, failing when the transition isn't part of the lifecycle.
    pub fn transition(&mut self, next: ResponseState) -> Result<(), SendError> {
        use ResponseState::*;

        let allowed = matches!(
            (*self, next),
            (Idle, HeadersSent) | (HeadersSent, BodyOpen) | (HeadersSent, BodyClosed) | (BodyOpen, BodyClosed) | (BodyClosed, Idle)
        );

        if !allowed {
            return Err(SendError::closed_stream(*self));
        }

        *self = next;
        Ok(())
    }

    /// Fails unless the current state is `expected`.
    pub fn expect(&self, expected: ResponseState) -> Result<(), SendError> {
        if *self == expected { Ok(()) } else { Err(SendError::closed_stream(*self)) }
    }

    #[inline]
    pub fn is_body_open(&self) -> bool {
        matches!(self, ResponseState::BodyOpen)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, ResponseState::BodyClosed)
    }
}
