//! Forward proxy: plain HTTP requests are re-issued upstream, CONNECT requests
//! become tunnels.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ferry_http::handler::Handler;
use ferry_http::protocol::body::ReqBody;
use ferry_http::tunnel::{ConnectTarget, PendingTunnel, connect_upstream};
use http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::request::Parts;
use http::{HeaderMap, HeaderName, Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use tracing::{info, warn};

use crate::body::{BoxError, ResponseBody};
use crate::file::status_response;

/// Headers that only concern one hop and are never forwarded upstream.
const HOP_BY_HOP: [&str; 8] =
    ["connection", "keep-alive", "proxy-authenticate", "proxy-authorization", "proxy-connection", "te", "trailer", "upgrade"];

/// Decides whether a client may use the proxy.
pub trait Authorizer: Debug + Send + Sync {
    fn authorize(&self, request: &Parts) -> bool;
}

/// Lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _request: &Parts) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct ProxyHandler {
    client: reqwest::Client,
    authorizer: Arc<dyn Authorizer>,
    connect_timeout: Duration,
}

impl ProxyHandler {
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        // never chain through the proxy named in the environment
        let client = reqwest::Client::builder().no_proxy().connect_timeout(connect_timeout).build()?;
        Ok(Self { client, authorizer: Arc::new(AllowAll), connect_timeout })
    }

    pub fn with_authorizer(mut self, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    async fn connect(&self, request: &Parts) -> Result<Response<ResponseBody>, BoxError> {
        let authority = request.uri.authority().map_or_else(|| request.uri.to_string(), ToString::to_string);
        let target = match ConnectTarget::parse(&authority) {
            Ok(target) => target,
            Err(e) => {
                warn!(cause = %e, "reject connect request");
                return status_response(StatusCode::BAD_REQUEST);
            }
        };

        match connect_upstream(&target, self.connect_timeout).await {
            Ok(upstream) => {
                info!(upstream = %target, "open tunnel");
                let mut response = Response::new(ResponseBody::empty());
                response.extensions_mut().insert(PendingTunnel::new(upstream));
                Ok(response)
            }
            Err(e) => {
                warn!(cause = %e, "can't reach tunnel target");
                status_response(StatusCode::BAD_GATEWAY)
            }
        }
    }

    async fn forward(&self, request: Parts, body: ReqBody) -> Result<Response<ResponseBody>, BoxError> {
        if request.uri.scheme().is_none() {
            warn!(uri = %request.uri, "proxy request without absolute uri");
            return status_response(StatusCode::BAD_REQUEST);
        }

        let mut upstream_request =
            self.client.request(request.method.clone(), request.uri.to_string()).headers(forwarded_headers(&request.headers));
        if request.method == Method::POST {
            // streamed through as it arrives, with the client's length when it sent one
            if let Some(length) = request.headers.get(CONTENT_LENGTH) {
                upstream_request = upstream_request.header(CONTENT_LENGTH, length.clone());
            }
            upstream_request = upstream_request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = match upstream_request.send().await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(uri = %request.uri, cause = %e, "upstream request failed");
                return status_response(StatusCode::BAD_GATEWAY);
            }
        };
        info!(method = %request.method, uri = %request.uri, status = upstream.status().as_u16(), "forwarded request");

        let mut response = Response::builder().status(upstream.status());
        if let Some(headers) = response.headers_mut() {
            for (name, value) in upstream.headers() {
                if name != TRANSFER_ENCODING && name != CONNECTION {
                    headers.append(name, value.clone());
                }
            }
        }

        Ok(response.body(ResponseBody::from_stream(upstream.bytes_stream()))?)
    }
}

/// The client's headers minus hop-by-hop ones. `Host` is derived again from the
/// upstream URL and `Content-Length` is set only alongside a forwarded body.
fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::try_from(token.trim()).ok())
        .collect();

    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let skip = HOP_BY_HOP.contains(&name.as_str())
            || name == TRANSFER_ENCODING
            || name == HOST
            || name == CONTENT_LENGTH
            || listed.contains(name);
        if !skip {
            forwarded.append(name, value.clone());
        }
    }
    forwarded
}

#[async_trait]
impl Handler<ReqBody> for ProxyHandler {
    type RespBody = ResponseBody;
    type Error = BoxError;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        let (parts, body) = req.into_parts();

        if !self.authorizer.authorize(&parts) {
            info!(method = %parts.method, uri = %parts.uri, "request refused");
            return status_response(StatusCode::FORBIDDEN);
        }

        match parts.method {
            Method::CONNECT => self.connect(&parts).await,
            Method::GET | Method::HEAD | Method::POST => self.forward(parts, body).await,
            _ => status_response(StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}
