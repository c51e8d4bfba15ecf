use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::registry::{BridgeRegistry, ServiceDescriptor};
use crate::server::config::DiscoveryStrategy;
use crate::server::target::InvocableTarget;
use crate::service_id::ServiceId;

pub const SERVICE_SUFFIX: &str = "Service";
pub const CONTROLLER_SUFFIX: &str = "Controller";

/// The controller name the convention strategy looks for, e.g. `UserController`
/// for `user.UserService`.
pub fn controller_name_for(service: &ServiceId) -> String {
    let leaf = service.leaf();
    let base = leaf.strip_suffix(SERVICE_SUFFIX).unwrap_or(leaf);
    format!("{base}{CONTROLLER_SUFFIX}")
}

/// Resolves a service to the target inbound requests for it are invoked on.
///
/// One locator is chosen per [`InboundBridge`](crate::server::InboundBridge) at
/// construction and used for every request.
pub trait ServiceLocator: Send + Sync {
    fn resolve(
        &self,
        registry: &BridgeRegistry,
        service: &ServiceDescriptor,
    ) -> Result<Arc<dyn InvocableTarget>, BridgeError>;
}

fn not_found(service: &ServiceDescriptor) -> BridgeError {
    BridgeError::NoControllerRegistered(service.id().to_string())
}

/// Looks up the controller named after the service (`UserService` → `UserController`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ConventionLocator;

impl ServiceLocator for ConventionLocator {
    fn resolve(
        &self,
        registry: &BridgeRegistry,
        service: &ServiceDescriptor,
    ) -> Result<Arc<dyn InvocableTarget>, BridgeError> {
        let name = controller_name_for(service.id());
        debug!(service = %service.id(), controller = %name, "Resolving by convention");
        registry
            .controller(&name)
            .cloned()
            .ok_or_else(|| not_found(service))
    }
}

/// Looks up the target explicitly bound to the service with
/// [`BridgeRegistry::bind_service`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLocator;

impl ServiceLocator for ConfigLocator {
    fn resolve(
        &self,
        registry: &BridgeRegistry,
        service: &ServiceDescriptor,
    ) -> Result<Arc<dyn InvocableTarget>, BridgeError> {
        registry
            .binding(service.id())
            .cloned()
            .ok_or_else(|| not_found(service))
    }
}

/// Picks the first catalogued controller implementing every method of the service.
///
/// Fallback strategy: when several controllers match, the choice depends on
/// registration order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReflectionLocator;

impl ServiceLocator for ReflectionLocator {
    fn resolve(
        &self,
        registry: &BridgeRegistry,
        service: &ServiceDescriptor,
    ) -> Result<Arc<dyn InvocableTarget>, BridgeError> {
        let matches: Vec<&Arc<dyn InvocableTarget>> = registry
            .controllers()
            .iter()
            .filter(|target| {
                let implemented = target.methods();
                service
                    .methods()
                    .iter()
                    .all(|method| implemented.contains(&method.name()))
            })
            .collect();

        let Some(&first) = matches.first() else {
            return Err(not_found(service));
        };

        if matches.len() > 1 {
            let names: Vec<&str> = matches.iter().map(|target| target.name()).collect();
            warn!(
                service = %service.id(),
                candidates = ?names,
                chosen = %first.name(),
                "Several controllers match service structurally"
            );
        }
        Ok(Arc::clone(first))
    }
}

impl DiscoveryStrategy {
    pub fn locator(self) -> Box<dyn ServiceLocator> {
        match self {
            Self::Convention => Box::new(ConventionLocator),
            Self::Config => Box::new(ConfigLocator),
            Self::Reflection => Box::new(ReflectionLocator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example;
    use crate::server::Controller;

    fn registry_with(controllers: Vec<Controller>) -> BridgeRegistry {
        let mut registry = BridgeRegistry::new();
        example::register(&mut registry).unwrap();
        for controller in controllers {
            registry.register_controller(Arc::new(controller)).unwrap();
        }
        registry
    }

    fn example_service(registry: &BridgeRegistry) -> &ServiceDescriptor {
        registry.service(&ServiceId::from(example::SERVICE)).unwrap()
    }

    #[test]
    fn test_controller_name_for() {
        assert_eq!(
            controller_name_for(&ServiceId::from("user.UserService")),
            "UserController"
        );
        assert_eq!(controller_name_for(&ServiceId::from("Billing")), "BillingController");
    }

    #[test]
    fn test_convention() {
        let registry = registry_with(vec![example::controller().unwrap()]);
        let target = ConventionLocator
            .resolve(&registry, example_service(&registry))
            .unwrap();
        assert_eq!(target.name(), "ExampleController");
    }

    #[test]
    fn test_convention_missing() {
        let registry = registry_with(vec![]);
        let err = ConventionLocator
            .resolve(&registry, example_service(&registry))
            .err()
            .unwrap();
        assert!(matches!(err, BridgeError::NoControllerRegistered(ref s) if s == example::SERVICE));
    }

    #[test]
    fn test_config() {
        let mut registry = registry_with(vec![]);
        registry
            .bind_service(example::SERVICE, Arc::new(example::controller().unwrap()))
            .unwrap();
        let target = ConfigLocator
            .resolve(&registry, example_service(&registry))
            .unwrap();
        assert_eq!(target.name(), "ExampleController");

        // Convention ignores explicit bindings.
        assert!(
            ConventionLocator
                .resolve(&registry, example_service(&registry))
                .is_err()
        );
    }

    #[test]
    fn test_reflection_picks_first_structural_match() {
        let mut unrelated = Controller::new("Unrelated");
        unrelated
            .register::<example::ExampleRequest, example::ExampleResponse, _, _>("Other", |_| async {
                Ok::<_, tonic::Status>(example::ExampleResponse::default())
            })
            .unwrap();

        let mut first = Controller::new("First");
        first
            .register::<example::ExampleRequest, example::ExampleResponse, _, _>(
                example::EXAMPLE_METHOD,
                |_| async { Ok::<_, tonic::Status>(example::ExampleResponse::default()) },
            )
            .unwrap();

        let registry = registry_with(vec![unrelated, first, example::controller().unwrap()]);
        let target = ReflectionLocator
            .resolve(&registry, example_service(&registry))
            .unwrap();
        assert_eq!(target.name(), "First");
    }

    #[test]
    fn test_reflection_no_match() {
        let registry = registry_with(vec![Controller::new("Empty")]);
        assert!(
            ReflectionLocator
                .resolve(&registry, example_service(&registry))
                .is_err()
        );
    }
}
