use std::future::Future;

use http::uri::PathAndQuery;
use tonic::client::Grpc;
use tonic::transport::{Channel, Endpoint};
use tonic::{IntoRequest, Request, Response, Status};
use tonic_prost::ProstCodec;
use tracing::debug;

use crate::client::config::InterceptorConfig;
use crate::client::interceptor::{Decision, PactInterceptor};
use crate::error::BridgeError;
use crate::message::JsonMessage;
use crate::names::MethodIdentifier;

/// The transport a [`BridgedClient`] dispatches proceeding calls to.
pub trait UnaryTransport: Send {
    fn call_unary<Req, Resp>(
        &mut self,
        path: PathAndQuery,
        request: Request<Req>,
    ) -> impl Future<Output = Result<Response<Resp>, Status>> + Send
    where
        Req: JsonMessage,
        Resp: JsonMessage;
}

impl UnaryTransport for Grpc<Channel> {
    async fn call_unary<Req, Resp>(
        &mut self,
        path: PathAndQuery,
        request: Request<Req>,
    ) -> Result<Response<Resp>, Status>
    where
        Req: JsonMessage,
        Resp: JsonMessage,
    {
        self.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {e}")))?;
        self.unary(request, path, ProstCodec::default()).await
    }
}

/// A unary gRPC client whose every call first goes through a [`PactInterceptor`].
///
/// # Example
///
/// ```ignore
/// let config = InterceptorConfig::builder().mode(InterceptMode::Replace).build();
/// let mut client = BridgedClient::connect_lazy("localhost:50051", config)?;
///
/// let response: Response<ExampleResponse> = client
///     .unary("/example.ExampleService/ExampleMethod", ExampleRequest { name: "Ada".into() })
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct BridgedClient<T = Grpc<Channel>> {
    inner: T,
    interceptor: PactInterceptor,
}

impl BridgedClient<Grpc<Channel>> {
    /// Build a client for the service at `target` (`host:port`) without connecting yet.
    pub fn connect_lazy(
        target: &str,
        config: InterceptorConfig,
    ) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(format!("http://{target}"))?.connect_lazy();
        Ok(Self::new(Grpc::new(channel), PactInterceptor::new(config)))
    }
}

impl<T: UnaryTransport> BridgedClient<T> {
    pub fn new(inner: T, interceptor: PactInterceptor) -> Self {
        Self { inner, interceptor }
    }

    pub fn interceptor(&self) -> &PactInterceptor {
        &self.interceptor
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Issue the unary call `method` (`/package.Service/Method`).
    ///
    /// Broker failures surface as the call's `Status` unless the interceptor is
    /// configured to log and continue.
    pub async fn unary<Req, Resp>(
        &mut self,
        method: &str,
        request: impl IntoRequest<Req>,
    ) -> Result<Response<Resp>, Status>
    where
        Req: JsonMessage,
        Resp: JsonMessage,
    {
        let identifier = MethodIdentifier::parse(method)?;
        let request = request.into_request();

        match self.interceptor.intercept(&identifier, request.get_ref()).await {
            Decision::Proceed => {
                let path = identifier
                    .grpc_path()
                    .parse::<PathAndQuery>()
                    .map_err(|_| BridgeError::InvalidMethodPath(method.to_string()))?;
                debug!(method = %identifier, "Dispatching call");
                self.inner.call_unary(path, request).await
            }
            Decision::Reply(body) => {
                let message = serde_json::from_slice::<Resp>(&body)
                    .map_err(|e| BridgeError::malformed(Resp::full_name(), e))?;
                debug!(method = %identifier, "Answered call from broker reply");
                Ok(Response::new(message))
            }
            Decision::Abort(err) => Err(err.into()),
        }
    }
}
