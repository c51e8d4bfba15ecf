use futures::future::BoxFuture;
use http::uri::PathAndQuery;
use tonic::Status;
use tonic::client::Grpc;
use tonic::transport::Channel;

use crate::client::UnaryTransport;
use crate::error::BridgeError;
use crate::message::{DynMessage, JsonMessage};
use crate::names::{self, MethodIdentifier};
use crate::service_id::ServiceId;

type JsonDecoder = fn(&[u8]) -> serde_json::Result<DynMessage>;

type RemoteCall =
    fn(Grpc<Channel>, PathAndQuery, DynMessage) -> BoxFuture<'static, Result<DynMessage, Status>>;

/// A registered message type and its JSON decoder.
#[derive(Clone)]
pub struct MessageType {
    full_name: String,
    decode: JsonDecoder,
}

impl MessageType {
    pub fn of<M: JsonMessage>() -> Self {
        Self {
            full_name: M::full_name(),
            decode: DynMessage::decode_json::<M>,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn leaf_name(&self) -> &str {
        names::leaf_name(&self.full_name)
    }

    /// Decode a JSON body into this message type.
    pub fn decode_json(&self, bytes: &[u8]) -> Result<DynMessage, BridgeError> {
        (self.decode)(bytes).map_err(|e| BridgeError::malformed(&self.full_name, e))
    }
}

impl std::fmt::Debug for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageType")
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

/// A unary method of a registered service.
#[derive(Clone)]
pub struct MethodDescriptor {
    identifier: MethodIdentifier,
    path: PathAndQuery,
    request_type: String,
    response_type: String,
    remote: RemoteCall,
}

impl MethodDescriptor {
    pub(crate) fn new<Req: JsonMessage, Resp: JsonMessage>(
        identifier: MethodIdentifier,
    ) -> Result<Self, BridgeError> {
        let path = identifier
            .grpc_path()
            .parse::<PathAndQuery>()
            .map_err(|_| BridgeError::InvalidMethodPath(identifier.grpc_path()))?;

        Ok(Self {
            identifier,
            path,
            request_type: Req::full_name(),
            response_type: Resp::full_name(),
            remote: remote_unary::<Req, Resp>,
        })
    }

    /// The method name as declared in the service, e.g. `GetUser`.
    pub fn name(&self) -> &str {
        self.identifier.action_name()
    }

    pub fn identifier(&self) -> &MethodIdentifier {
        &self.identifier
    }

    /// The gRPC request path, e.g. `/user.UserService/GetUser`.
    pub fn path(&self) -> &PathAndQuery {
        &self.path
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    /// The snake_case route segment this method answers to.
    pub fn action_segment(&self) -> String {
        names::snake_case(self.name())
    }

    /// Perform this method as a unary call over `grpc`.
    pub async fn call_remote(
        &self,
        grpc: Grpc<Channel>,
        request: DynMessage,
    ) -> Result<DynMessage, Status> {
        (self.remote)(grpc, self.path.clone(), request).await
    }
}

impl std::fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("path", &self.path)
            .field("request_type", &self.request_type)
            .field("response_type", &self.response_type)
            .finish_non_exhaustive()
    }
}

fn remote_unary<Req: JsonMessage, Resp: JsonMessage>(
    mut grpc: Grpc<Channel>,
    path: PathAndQuery,
    request: DynMessage,
) -> BoxFuture<'static, Result<DynMessage, Status>> {
    Box::pin(async move {
        let request = request.downcast::<Req>().map_err(|other| {
            Status::invalid_argument(format!(
                "expected {}, got {}",
                Req::full_name(),
                other.type_name()
            ))
        })?;
        let response = grpc
            .call_unary::<Req, Resp>(path, tonic::Request::new(request))
            .await?;
        Ok(DynMessage::new(response.into_inner()))
    })
}

/// A registered service and its unary methods, in registration order.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    id: ServiceId,
    methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    pub(crate) fn new(id: ServiceId) -> Self {
        Self {
            id,
            methods: Vec::new(),
        }
    }

    pub(crate) fn push_method(&mut self, method: MethodDescriptor) {
        self.methods.push(method);
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name() == name)
    }

    /// The first method whose snake_case name equals `action`.
    ///
    /// Colliding names (`GetUser` / `getUser`) resolve to whichever was registered first.
    pub fn method_for_action(&self, action: &str) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|method| method.action_segment() == action)
    }

    /// The route segment this service answers to, e.g. `Pkg_Sub`.
    pub fn route_segment(&self) -> String {
        let package: Vec<String> = self.id.package().into_iter().map(str::to_string).collect();
        names::service_path_segment(&package, self.id.leaf())
    }
}
