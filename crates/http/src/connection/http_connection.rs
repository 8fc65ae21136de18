use std::error::Error;
use std::fmt::Display;

use bytes::{Buf, Bytes};
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use http::header::{CONNECTION, CONTENT_LENGTH};
use http::{HeaderMap, Method, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::select;

use crate::codec::RequestDecoder;
use crate::connection::{ConnectionConfig, ResponseWriter};
use crate::handler::Handler;
use crate::negotiate::{EncodingDecision, EncodingNegotiator};
use crate::protocol::body::ReqBody;
use crate::protocol::{HttpError, Message, ParseError, PayloadSize, RequestHeader, ResponseHead, SendError, is_bodiless_status};
use crate::tunnel::{PendingTunnel, TunnelRelay};

use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";
const CONNECTION_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection Established\r\n\r\n";

/// Buffered body bytes that trigger a write to the socket while the body keeps
/// producing frames without waiting.
const FLUSH_WATERMARK: usize = 16 * 1024;

/// An HTTP connection that manages request processing and response streaming
///
/// `HttpConnection` handles the full lifecycle of an HTTP connection, including:
/// - Reading and decoding requests
/// - Handling the expect-continue mechanism
/// - Streaming request bodies to the handler while it runs
/// - Sending responses through the negotiated transfer pipeline
/// - Keep-alive, and switching into a tunnel after a CONNECT
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
///
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: ResponseWriter<W>,
    negotiator: EncodingNegotiator,
    config: ConnectionConfig,
}

/// What happens to the connection once a response is out.
enum Next {
    KeepAlive,
    Close,
    Tunnel(TcpStream),
}

/// The request facts needed after the request itself moved into the handler.
struct Exchange {
    request_headers: HeaderMap,
    is_head: bool,
    wants_close: bool,
}

impl Exchange {
    fn of(header: &RequestHeader) -> Self {
        Self { request_headers: header.headers().clone(), is_head: header.method() == Method::HEAD, wants_close: header.wants_close() }
    }

    /// For responses to requests that couldn't be decoded.
    fn broken() -> Self {
        Self { request_headers: HeaderMap::new(), is_head: false, wants_close: true }
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, ConnectionConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: ConnectionConfig) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), config.read_buffer_size),
            writer: ResponseWriter::with_capacity(writer, config.read_buffer_size),
            negotiator: EncodingNegotiator::new(config.encoding),
            config,
        }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler<ReqBody>,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, payload_size)))) => match self.do_process(header, payload_size, &handler).await? {
                    Next::KeepAlive => {}
                    Next::Close => {
                        debug!("response asked for close, connection shutdown");
                        self.writer.shutdown().await?;
                        return Ok(());
                    }
                    Next::Tunnel(upstream) => return self.tunnel(upstream).await,
                },

                Some(Ok(Message::Payload(_))) => {
                    error!("error status because chunked has read in do_process");
                    let error_response = build_error_response(StatusCode::BAD_REQUEST);
                    self.do_send_response(error_response, &Exchange::broken()).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    let error_response = build_error_response(StatusCode::BAD_REQUEST);
                    self.do_send_response(error_response, &Exchange::broken()).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, header: RequestHeader, payload_size: PayloadSize, handler: &Arc<H>) -> Result<Next, HttpError>
    where
        H: Handler<ReqBody>,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        if header.expects_continue() && !payload_size.is_empty() {
            self.writer.write_raw(CONTINUE)?;
            self.writer.flush().await?;
            info!("receive expect request header, sent continue response");
        }

        let exchange = Exchange::of(&header);
        let (req_body, mut body_sender) = ReqBody::body_channel(&mut self.framed_read, payload_size);
        let request = header.body(req_body);

        // the handler may wait on body frames, so the body is fed while it runs
        let response_result = {
            tokio::pin! {
                let request_handle_future = handler.call(request);
                let body_sender_future = body_sender.send_body();
            }

            let mut body_done = false;
            loop {
                select! {
                    biased;
                    response = &mut request_handle_future => break response,
                    result = &mut body_sender_future, if !body_done => {
                        body_done = true;
                        if let Err(e) = result {
                            warn!(cause = %e, "request body stream failed");
                        }
                    }
                }
            }
        };

        // drain what the handler left unread, the next request starts after it
        body_sender.skip_body().await?;

        match response_result {
            Ok(mut response) => {
                if let Some(upstream) = response.extensions_mut().remove::<PendingTunnel>().and_then(|pending| pending.take()) {
                    return Ok(Next::Tunnel(upstream));
                }
                self.send_response(Ok::<_, H::Error>(response), &exchange).await
            }
            Err(e) => self.send_response(Err::<Response<H::RespBody>, _>(e), &exchange).await,
        }
    }

    async fn send_response<T, E>(&mut self, response_result: Result<Response<T>, E>, exchange: &Exchange) -> Result<Next, HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let close = match response_result {
            Ok(response) => self.do_send_response(response, exchange).await?,
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handle response error");
                let error_response = build_error_response(StatusCode::INTERNAL_SERVER_ERROR);
                self.do_send_response(error_response, exchange).await?
            }
        };

        Ok(if close { Next::Close } else { Next::KeepAlive })
    }

    /// Sends one response; returns whether the connection closes after it.
    async fn do_send_response<T>(&mut self, response: Response<T>, exchange: &Exchange) -> Result<bool, HttpError>
    where
        T: Body + Unpin,
        T::Error: Display,
    {
        let (header_parts, mut body) = response.into_parts();
        let head = ResponseHead::from_parts(header_parts, ());

        let close = !self.config.keep_alive || exchange.wants_close || has_close_token(head.headers());
        let decision = if is_bodiless_status(head.status()) {
            EncodingDecision::bodiless(None, close)
        } else {
            let content_length = declared_length(head.headers()).or_else(|| body.size_hint().exact());
            if exchange.is_head {
                EncodingDecision::bodiless(content_length, close)
            } else {
                self.negotiator.decide_for_response(&exchange.request_headers, head.headers(), content_length, close)
            }
        };

        self.writer.write_head(head, decision, self.negotiator.config())?;

        if self.writer.state().is_body_open() {
            loop {
                let next = match body.frame().now_or_never() {
                    Some(next) => next,
                    None => {
                        // nothing more is ready, so the client gets what the body produced so far
                        self.writer.flush_body()?;
                        self.writer.flush().await?;
                        body.frame().await
                    }
                };
                match next {
                    Some(Ok(frame)) => {
                        // trailers are not forwarded
                        let Ok(mut data) = frame.into_data() else { continue };
                        while data.has_remaining() {
                            let chunk = data.chunk();
                            let len = chunk.len();
                            self.writer.write_body(chunk)?;
                            data.advance(len);
                        }
                        if self.writer.buffered() >= FLUSH_WATERMARK {
                            self.writer.flush().await?;
                        }
                    }
                    Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                    None => break,
                }
            }
            self.writer.finish_body()?;
        }

        self.writer.flush().await?;
        self.writer.reset()?;
        Ok(close)
    }

    /// Stops speaking HTTP: confirms the tunnel and relays bytes until a side closes.
    async fn tunnel(mut self, upstream: TcpStream) -> Result<(), HttpError> {
        self.writer.write_raw(CONNECTION_ESTABLISHED)?;
        self.writer.flush().await?;

        let parts = self.framed_read.into_parts();
        let stats = TunnelRelay::with_buffer_size(self.config.relay_buffer_size)
            .run_with_prefix(&parts.read_buf, parts.io, self.writer.into_inner(), upstream)
            .await?;

        info!(
            client_to_upstream = stats.client_to_upstream,
            upstream_to_client = stats.upstream_to_client,
            closed_by = ?stats.closed_by,
            "tunnel finished"
        );
        Ok(())
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers.get(CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
}

fn has_close_token(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("close"))
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::<Bytes>::new());
    *response.status_mut() = status_code;
    response
}
