use tonic::Status;
use tonic::client::Grpc;
use tonic::transport::{Channel, Endpoint};

use crate::message::DynMessage;
use crate::registry::{MethodDescriptor, ServiceDescriptor};
use crate::server::locator::controller_name_for;

/// Something the inbound bridge can invoke a resolved method on.
#[tonic::async_trait]
pub trait InvocableTarget: Send + Sync + 'static {
    /// Name used by the controller catalog, e.g. `UserController`.
    fn name(&self) -> &str;

    /// Names of the methods this target implements, e.g. `GetUser`.
    fn methods(&self) -> Vec<&str>;

    /// Invoke `method` with a request already decoded into its request type.
    async fn invoke(
        &self,
        method: &MethodDescriptor,
        request: DynMessage,
    ) -> Result<DynMessage, Status>;
}

/// Forwards invocations to a live gRPC service.
#[derive(Debug, Clone)]
pub struct StubTarget {
    name: String,
    service: ServiceDescriptor,
    grpc: Grpc<Channel>,
}

impl StubTarget {
    /// A stub for `service` over `channel`, catalogued under the service's
    /// conventional controller name.
    pub fn new(channel: Channel, service: &ServiceDescriptor) -> Self {
        Self {
            name: controller_name_for(service.id()),
            service: service.clone(),
            grpc: Grpc::new(channel),
        }
    }

    /// A stub for `service` at `target` (`host:port`), connecting on first use.
    pub fn connect_lazy(
        target: &str,
        service: &ServiceDescriptor,
    ) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(format!("http://{target}"))?.connect_lazy();
        Ok(Self::new(channel, service))
    }
}

#[tonic::async_trait]
impl InvocableTarget for StubTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn methods(&self) -> Vec<&str> {
        self.service.methods().iter().map(|m| m.name()).collect()
    }

    async fn invoke(
        &self,
        method: &MethodDescriptor,
        request: DynMessage,
    ) -> Result<DynMessage, Status> {
        if self.service.method(method.name()).is_none() {
            return Err(Status::unimplemented(format!(
                "{} is not a method of {}",
                method.path(),
                self.service.id()
            )));
        }
        method.call_remote(self.grpc.clone(), request).await
    }
}
