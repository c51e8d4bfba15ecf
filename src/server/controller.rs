use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::marker::PhantomData;

use futures::future::{self, BoxFuture};
use tonic::Status;
use tracing::debug;

use crate::message::{DynMessage, JsonMessage};
use crate::registry::{MethodDescriptor, RegistryError};
use crate::server::target::InvocableTarget;

/// Type-erased unary handler.
trait ErasedHandler: Send + Sync {
    fn call(&self, request: DynMessage) -> BoxFuture<'static, Result<DynMessage, Status>>;
}

struct TypedHandler<Req, Resp, F> {
    handler: F,
    _marker: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp, F, Fut> ErasedHandler for TypedHandler<Req, Resp, F>
where
    Req: JsonMessage,
    Resp: JsonMessage,
    F: Fn(Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
{
    fn call(&self, request: DynMessage) -> BoxFuture<'static, Result<DynMessage, Status>> {
        let request = match request.downcast::<Req>() {
            Ok(request) => request,
            Err(other) => {
                return Box::pin(future::ready(Err(Status::invalid_argument(format!(
                    "expected {}, got {}",
                    Req::full_name(),
                    other.type_name()
                )))));
            }
        };

        let response = (self.handler)(request);
        Box::pin(async move { response.await.map(DynMessage::new) })
    }
}

/// An in-process implementation of a service's methods.
///
/// # Example
/// ```ignore
/// let mut controller = Controller::new("UserController");
/// controller.register::<GetUserRequest, GetUserResponse, _, _>("GetUser", |request| async move {
///     Ok(GetUserResponse { name: lookup(&request.id)? })
/// })?;
/// registry.register_controller(Arc::new(controller))?;
/// ```
pub struct Controller {
    name: String,
    handlers: HashMap<String, Box<dyn ErasedHandler>, ahash::RandomState>,
}

impl Controller {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::default(),
        }
    }

    /// Register the handler for `method` (the name as declared in the service, e.g. `GetUser`).
    pub fn register<Req, Resp, F, Fut>(
        &mut self,
        method: impl Into<String>,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        Req: JsonMessage,
        Resp: JsonMessage,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    {
        match self.handlers.entry(method.into()) {
            Entry::Occupied(entry) => Err(RegistryError::already_registered(
                "handler",
                format!("{}.{}", self.name, entry.key()),
            )),
            Entry::Vacant(slot) => {
                debug!(controller = %self.name, method = %slot.key(), "Registered handler");
                slot.insert(Box::new(TypedHandler::<Req, Resp, F> {
                    handler,
                    _marker: PhantomData,
                }));
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[tonic::async_trait]
impl InvocableTarget for Controller {
    fn name(&self) -> &str {
        &self.name
    }

    fn methods(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    async fn invoke(
        &self,
        method: &MethodDescriptor,
        request: DynMessage,
    ) -> Result<DynMessage, Status> {
        let handler = self.handlers.get(method.name()).ok_or_else(|| {
            Status::unimplemented(format!("{} does not implement {}", self.name, method.name()))
        })?;
        handler.call(request).await
    }
}
