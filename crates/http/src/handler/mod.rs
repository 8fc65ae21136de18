//! Request handlers.
//!
//! A [`Handler`] turns a request, whose body streams in while the handler runs, into
//! a response. It never touches the socket: framing, compression and keep-alive are
//! decided by the connection afterwards. A handler influences them only through the
//! response it returns:
//!
//! - `Content-Length` (or an exact body size hint) keeps the body unchunked
//! - `Content-Encoding` from an upstream disables gzip for that response
//! - `Connection: close` ends the connection after this response
//! - a [`PendingTunnel`](crate::tunnel::PendingTunnel) extension turns the connection
//!   into a CONNECT tunnel
//!
//! Async functions become handlers through [`make_handler`].

use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use http::{Request, Response};
use http_body::Body;

#[async_trait]
pub trait Handler<ReqBody>: Send + Sync {
    type RespBody: Body;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error>;
}

/// Shared handlers, including `Arc<dyn Handler<..>>` picked at runtime.
#[async_trait]
impl<ReqBody, H> Handler<ReqBody> for Arc<H>
where
    ReqBody: Send + 'static,
    H: Handler<ReqBody> + ?Sized,
{
    type RespBody = H::RespBody;
    type Error = H::Error;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        (**self).call(req).await
    }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<ReqBody, RespBody, Err, F, Fut> Handler<ReqBody> for HandlerFn<F>
where
    RespBody: Body,
    ReqBody: Send + 'static,
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(req).await
    }
}

/// Wraps an async function, or a closure returning a future, as a [`Handler`].
pub fn make_handler<F, ReqBody, RespBody, Err, Ret>(f: F) -> HandlerFn<F>
where
    RespBody: Body,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Ret: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<ReqBody>) -> Ret,
{
    HandlerFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use std::convert::Infallible;

    async fn echo_path(req: Request<()>) -> Result<Response<Full<Bytes>>, Infallible> {
        Ok(Response::new(Full::new(Bytes::from(req.uri().path().to_owned()))))
    }

    #[tokio::test]
    async fn closure_handler() {
        let handler = make_handler(|req: Request<()>| async move {
            let body = Full::new(Bytes::from(req.uri().path().to_owned()));
            Ok::<_, Infallible>(Response::new(body))
        });

        let request = Request::builder().uri("/files/a.txt").body(()).unwrap();
        let response = handler.call(request).await.unwrap();
        assert_eq!(response.body().size_hint().exact(), Some(12));
    }

    #[tokio::test]
    async fn shared_handler() {
        let handler: Arc<dyn Handler<(), RespBody = Full<Bytes>, Error = Infallible>> = Arc::new(make_handler(echo_path));
        let request = Request::builder().uri("/a").body(()).unwrap();
        let response = handler.call(request).await.unwrap();
        assert_eq!(response.body().size_hint().exact(), Some(2));
    }
}
