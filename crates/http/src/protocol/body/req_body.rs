use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, SinkExt, Stream, StreamExt};

use http_body::{Body, Frame};
use tracing::{error, info, trace};

use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};

/// ReqBody streams an HTTP request body to a handler without buffering it.
///
/// # Architecture
///
/// ReqBody uses a channel-based architecture:
/// - `ReqBody`: consumer side that implements `http_body::Body`
/// - `ReqBodySender`: producer side that reads from the connection's payload stream
/// - They communicate through a mpsc channel of oneshot senders, one per requested frame
///
/// # Example Flow
///
/// 1. HttpConnection creates the ReqBody/ReqBodySender pair
/// 2. ReqBody is passed to the request handler inside the `Request`
/// 3. ReqBodySender runs concurrently to answer frame requests
/// 4. If the handler doesn't read the entire body, the remainder is skipped so the
///    connection can be reused
#[derive(Debug)]
pub struct ReqBody {
    signal: mpsc::Sender<oneshot::Sender<PayloadItem>>,
    receiving: Option<oneshot::Receiver<PayloadItem>>,
    eof: bool,
}

impl ReqBody {
    fn new(signal: mpsc::Sender<oneshot::Sender<PayloadItem>>, eof: bool) -> Self {
        Self { signal, receiving: None, eof }
    }

    /// Creates a body streaming channel pair for one request.
    ///
    /// The returned ReqBody can be handed to request handlers, while ReqBodySender
    /// reads from the underlying payload stream when frames are requested.
    pub fn body_channel<S>(payload_stream: &mut S, payload_size: PayloadSize) -> (ReqBody, ReqBodySender<'_, S>)
    where
        S: Stream + Unpin,
    {
        let (tx, receiver) = mpsc::channel(16);

        let req_body = ReqBody::new(tx, payload_size.is_empty());

        let body_sender = ReqBodySender { payload_stream, receiver, eof: false };

        (req_body, body_sender)
    }
}

/// ReqBodySender reads body chunks from the connection's payload stream.
///
/// It keeps an EOF flag so the connection knows whether the body has been fully
/// consumed before the next request is decoded.
#[derive(Debug)]
pub struct ReqBodySender<'conn, S>
where
    S: Stream + Unpin,
{
    payload_stream: &'conn mut S,
    receiver: mpsc::Receiver<oneshot::Sender<PayloadItem>>,
    eof: bool,
}

impl<S> ReqBodySender<'_, S>
where
    S: Stream<Item = Result<Message<(RequestHeader, PayloadSize)>, ParseError>> + Unpin,
{
    /// Answers frame requests from the ReqBody until the body is complete or fails.
    pub async fn send_body(&mut self) -> Result<(), ParseError> {
        loop {
            if self.eof {
                return Ok(());
            }

            let Some(sender) = self.receiver.next().await else {
                // the handler dropped its body, the rest is skipped later
                return Ok(());
            };

            match self.payload_stream.next().await {
                Some(Ok(Message::Payload(payload_item))) => {
                    if payload_item.is_eof() {
                        self.eof = true;
                    }
                    if sender.send(payload_item).is_err() {
                        trace!("request body receiver dropped before frame delivered");
                    }
                }

                Some(Ok(Message::Header(_header))) => {
                    error!("received header from receive body phase");
                    return Err(ParseError::invalid_body("received header from receive body phase"));
                }

                Some(Err(e)) => {
                    return Err(e);
                }

                None => {
                    error!("cant read body");
                    return Err(ParseError::invalid_body("cant read body"));
                }
            }
        }
    }

    /// Drains any remaining body chunks from the payload stream.
    ///
    /// The connection calls this after the handler returns so that the next request
    /// starts at a message boundary.
    pub async fn skip_body(&mut self) -> Result<(), ParseError> {
        if self.eof {
            return Ok(());
        }

        let mut size: usize = 0;
        loop {
            match self.payload_stream.next().await {
                Some(Ok(Message::Payload(PayloadItem::Eof))) => {
                    self.eof = true;
                    if size > 0 {
                        info!(size = size, "skip request body");
                    }
                    return Ok(());
                }
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => size += bytes.len(),
                Some(Ok(Message::Header(_))) => return Err(ParseError::invalid_body("received header while skipping body")),
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::invalid_body("connection closed while skipping body")),
            }
        }
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        loop {
            if self.eof {
                return Poll::Ready(None);
            }

            if let Some(oneshot_receiver) = &mut self.receiving {
                return match ready!(oneshot_receiver.poll_unpin(cx)) {
                    Ok(PayloadItem::Chunk(bytes)) => {
                        self.receiving.take();
                        Poll::Ready(Some(Ok(Frame::data(bytes))))
                    }
                    Ok(PayloadItem::Eof) => {
                        self.receiving.take();
                        self.eof = true;
                        Poll::Ready(None)
                    }
                    Err(_) => {
                        self.receiving.take();
                        Poll::Ready(Some(Err(ParseError::invalid_body("parse body canceled"))))
                    }
                };
            }

            match ready!(self.signal.poll_ready_unpin(cx)) {
                Ok(()) => {
                    let (tx, rx) = oneshot::channel();
                    match self.signal.start_send(tx) {
                        Ok(()) => {
                            self.receiving = Some(rx);
                        }
                        Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
                    }
                }
                Err(e) => return Poll::Ready(Some(Err(ParseError::invalid_body(e)))),
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.eof
    }
}
