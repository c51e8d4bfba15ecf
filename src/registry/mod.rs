//! Startup-built registry of message types, services, controllers and explicit bindings.
//!
//! Stands in for looking types up by name at runtime: everything the inbound bridge
//! can resolve has been registered here through a static call before serving starts.
//! Once handed to an [`InboundBridge`](crate::server::InboundBridge) the registry is
//! frozen behind an `Arc` and only read.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::BridgeError;
use crate::message::JsonMessage;
use crate::names::{self, BridgeRoute, MethodIdentifier};
use crate::server::InvocableTarget;
use crate::service_id::ServiceId;

pub use self::descriptor::{MessageType, MethodDescriptor, ServiceDescriptor};
pub use self::error::RegistryError;

mod descriptor;
mod error;

/// The service, method and request type an inbound route resolved to.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRoute<'a> {
    pub service: &'a ServiceDescriptor,
    pub method: &'a MethodDescriptor,
    pub request_type: &'a MessageType,
}

#[derive(Default)]
pub struct BridgeRegistry {
    messages: HashMap<String, MessageType, ahash::RandomState>,
    services: HashMap<ServiceId, ServiceDescriptor, ahash::RandomState>,
    controllers: Vec<Arc<dyn InvocableTarget>>,
    bindings: HashMap<ServiceId, Arc<dyn InvocableTarget>, ahash::RandomState>,
}

impl BridgeRegistry {
    /// Construct a new empty [`BridgeRegistry`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message type. Registering the same type twice is a no-op.
    pub fn register_message<M: JsonMessage>(&mut self) {
        let message_type = MessageType::of::<M>();
        self.messages
            .entry(message_type.full_name().to_string())
            .or_insert(message_type);
    }

    /// Register the unary method `service/method` along with its request and response types.
    ///
    /// # Example
    /// ```ignore
    /// registry.register_method::<GetUserRequest, GetUserResponse>("user.UserService", "GetUser")?;
    /// ```
    pub fn register_method<Req, Resp>(
        &mut self,
        service: &str,
        method: &str,
    ) -> Result<(), RegistryError>
    where
        Req: JsonMessage,
        Resp: JsonMessage,
    {
        let identifier = MethodIdentifier::parse(&format!("/{service}/{method}"))?;
        let service_id = identifier.service_id();
        let descriptor = MethodDescriptor::new::<Req, Resp>(identifier)?;

        let service = self
            .services
            .entry(service_id.clone())
            .or_insert_with(|| ServiceDescriptor::new(service_id));
        if service.method(descriptor.name()).is_some() {
            return Err(RegistryError::already_registered(
                "method",
                descriptor.path().as_str(),
            ));
        }

        info!(
            path = %descriptor.path(),
            request_type = %descriptor.request_type(),
            response_type = %descriptor.response_type(),
            "Registered bridged method"
        );
        service.push_method(descriptor);

        self.register_message::<Req>();
        self.register_message::<Resp>();
        Ok(())
    }

    /// Add a target to the controller catalog used by the convention and reflection strategies.
    pub fn register_controller(
        &mut self,
        target: Arc<dyn InvocableTarget>,
    ) -> Result<(), RegistryError> {
        if self.controller(target.name()).is_some() {
            return Err(RegistryError::already_registered("controller", target.name()));
        }
        info!(controller = %target.name(), "Registered controller");
        self.controllers.push(target);
        Ok(())
    }

    /// Bind a service explicitly to a target, for the config strategy.
    pub fn bind_service(
        &mut self,
        service: impl Into<ServiceId>,
        target: Arc<dyn InvocableTarget>,
    ) -> Result<(), RegistryError> {
        match self.bindings.entry(service.into()) {
            Entry::Occupied(entry) => Err(RegistryError::already_registered(
                "binding",
                entry.key().as_str(),
            )),
            Entry::Vacant(slot) => {
                info!(service = %slot.key(), target = %target.name(), "Bound service");
                slot.insert(target);
                Ok(())
            }
        }
    }

    pub fn service(&self, id: &ServiceId) -> Option<&ServiceDescriptor> {
        self.services.get(id)
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.values()
    }

    pub fn message_type(&self, full_name: &str) -> Option<&MessageType> {
        self.messages.get(full_name)
    }

    /// Look a message type up by fully-qualified name, or by leaf name when exactly
    /// one registered type has it.
    pub fn find_message_type(&self, name: &str) -> Option<&MessageType> {
        if let Some(message_type) = self.message_type(name) {
            return Some(message_type);
        }
        let mut matches = self
            .messages
            .values()
            .filter(|message_type| message_type.leaf_name() == name);
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    pub fn controller(&self, name: &str) -> Option<&Arc<dyn InvocableTarget>> {
        self.controllers.iter().find(|target| target.name() == name)
    }

    /// The controller catalog in registration order.
    pub fn controllers(&self) -> &[Arc<dyn InvocableTarget>] {
        &self.controllers
    }

    pub fn binding(&self, service: &ServiceId) -> Option<&Arc<dyn InvocableTarget>> {
        self.bindings.get(service)
    }

    /// Resolve an inbound route to a registered service, method and request type.
    ///
    /// Services are matched in route space: the recomputed route segment must equal
    /// the path segment and the service must answer to the action. A `service=`
    /// discriminator narrows the match to that leaf name. The segment does not carry
    /// package casing (`pkg.sub` and `pkg.Sub` both give `Pkg_Sub`), so a match must
    /// be unique.
    pub fn resolve_route(&self, route: &BridgeRoute) -> Result<ResolvedRoute<'_>, BridgeError> {
        let service = self.resolve_service(route)?;

        let method = service
            .method_for_action(route.action_segment())
            .ok_or_else(|| {
                BridgeError::UnresolvableRoute(format!(
                    "service {} has no method matching action '{}'",
                    service.id(),
                    route.action_segment()
                ))
            })?;

        let request_type = self.message_type(method.request_type()).ok_or_else(|| {
            BridgeError::UnresolvableRoute(format!(
                "request type {} is not registered",
                method.request_type()
            ))
        })?;

        if let Some(requested) = route.request_type_query()
            && requested != request_type.full_name()
            && requested != request_type.leaf_name()
        {
            return Err(BridgeError::UnresolvableRoute(format!(
                "request type {requested} does not match {} (expects {})",
                method.path(),
                request_type.full_name()
            )));
        }

        Ok(ResolvedRoute {
            service,
            method,
            request_type,
        })
    }

    fn resolve_service(&self, route: &BridgeRoute) -> Result<&ServiceDescriptor, BridgeError> {
        let segment = route.service_path_segment();
        let mut candidates: Vec<&ServiceDescriptor> = self
            .services
            .values()
            .filter(|service| service.route_segment() == segment)
            .filter(|service| {
                route
                    .service_query()
                    .is_none_or(|leaf| leaf == service.id().leaf())
            })
            .filter(|service| service.method_for_action(route.action_segment()).is_some())
            .collect();

        match candidates.len() {
            0 => Err(BridgeError::UnresolvableRoute(format!(
                "no registered service matches {route}"
            ))),
            1 => Ok(candidates.remove(0)),
            _ => {
                candidates.sort_by(|a, b| a.id().cmp(b.id()));
                let names: Vec<&str> = candidates.iter().map(|s| s.id().as_str()).collect();
                debug!(route = %route, candidates = ?names, "Ambiguous route");
                Err(BridgeError::UnresolvableRoute(format!(
                    "{route} is ambiguous between {}",
                    names.join(", ")
                )))
            }
        }
    }
}

impl std::fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRegistry")
            .field("messages", &self.messages.len())
            .field("services", &self.services.len())
            .field("controllers", &self.controllers.len())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
