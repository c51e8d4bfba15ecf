//! Tower middleware putting an [`InboundBridge`] in front of a downstream service.

use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tower::{BoxError, Layer, Service};
use tracing::debug;

use crate::error::BridgeError;
use crate::server::bridge::InboundBridge;

/// Tower layer serving bridged routes itself and passing everything else downstream.
#[derive(Clone)]
pub struct PactBridgeLayer {
    bridge: Arc<InboundBridge>,
}

impl PactBridgeLayer {
    pub fn new(bridge: InboundBridge) -> Self {
        Self::from_shared(Arc::new(bridge))
    }

    pub fn from_shared(bridge: Arc<InboundBridge>) -> Self {
        Self { bridge }
    }
}

impl<S> Layer<S> for PactBridgeLayer {
    type Service = PactBridgeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PactBridgeService {
            inner,
            bridge: Arc::clone(&self.bridge),
        }
    }
}

/// The service wrapper produced by [`PactBridgeLayer`].
#[derive(Clone)]
pub struct PactBridgeService<S> {
    inner: S,
    bridge: Arc<InboundBridge>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PactBridgeService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: http_body::Body<Data = Bytes> + Send + 'static,
    ReqBody::Error: Into<BoxError>,
    ResBody: From<Bytes> + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if !self.bridge.handles(req.uri().path()) {
            debug!(path = %req.uri().path(), "Passing request downstream");
            return Box::pin(self.inner.call(req));
        }

        let bridge = Arc::clone(&self.bridge);
        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let path = parts.uri.path();
            let query = parts.uri.query();

            let limit = bridge.config().max_body_bytes;
            let body = match Limited::new(body, limit).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    let reason = if e.is::<LengthLimitError>() {
                        format!("request body exceeds {limit} bytes")
                    } else {
                        format!("failed to read body: {e}")
                    };
                    let err = BridgeError::malformed("request body", reason);
                    return Ok(InboundBridge::respond(path, Err(err)));
                }
            };
            Ok(bridge.handle(path, query, body).await)
        })
    }
}
