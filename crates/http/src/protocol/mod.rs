//! Core HTTP protocol abstractions.
//!
//! This module provides the message, request, response and error types shared by
//! the codecs, the transfer pipeline and the connection driver.
//!
//! # Architecture
//!
//! - **Message Handling** ([`message`]): [`Message`], [`PayloadItem`] and [`PayloadSize`]
//! - **Request Processing** ([`request`]): [`RequestHeader`] with keep-alive and
//!   expect-continue inspection
//! - **Response Processing** ([`response`]): [`ResponseHead`] and [`ResponseState`],
//!   the explicit lifecycle of a response on the wire
//! - **Body Streaming** ([`body`]): [`body::ReqBody`], an `http_body::Body` fed by the
//!   connection while the handler runs
//! - **Error Handling** ([`error`]): [`HttpError`], [`ParseError`], [`SendError`]

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;
pub use response::is_bodiless_status;

mod state;
pub use state::ResponseState;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
