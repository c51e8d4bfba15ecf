use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use http::{Response, StatusCode, header};
use tracing::{error, info};

use crate::error::BridgeError;
use crate::interaction::TranscodedInteraction;
use crate::names;
use crate::registry::BridgeRegistry;
use crate::server::config::BridgeConfig;
use crate::server::locator::ServiceLocator;

/// Replays bridged HTTP requests as invocations of registered services.
///
/// Holds the frozen registry and the locator chosen from the configured
/// discovery strategy. Shared read-only across concurrent requests.
pub struct InboundBridge {
    config: BridgeConfig,
    registry: Arc<BridgeRegistry>,
    locator: Box<dyn ServiceLocator>,
}

impl InboundBridge {
    pub fn new(registry: impl Into<Arc<BridgeRegistry>>, config: BridgeConfig) -> Self {
        let locator = config.discovery_strategy.locator();
        Self {
            config,
            registry: registry.into(),
            locator,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    /// Whether `path` is a bridged route rather than a downstream one.
    pub fn handles(&self, path: &str) -> bool {
        names::is_bridged(&self.config.bridge_prefix, path)
    }

    /// Resolve, decode, invoke and encode one bridged request.
    pub async fn dispatch(
        &self,
        path: &str,
        query: Option<&str>,
        body: Bytes,
    ) -> Result<Bytes, BridgeError> {
        let route = names::parse_request_path(&self.config.bridge_prefix, path, query)?;
        let interaction = TranscodedInteraction::inbound(route, body);

        info!(
            interaction_id = %interaction.id(),
            route = %interaction.route(),
            "Bridging inbound request"
        );

        let resolved = self.registry.resolve_route(interaction.route())?;
        let request = resolved.request_type.decode_json(interaction.payload())?;
        let target = self.locator.resolve(&self.registry, resolved.service)?;

        let response = AssertUnwindSafe(target.invoke(resolved.method, request))
            .catch_unwind()
            .await
            .map_err(|panic| BridgeError::HandlerFailure {
                message: panic_message(panic.as_ref()),
            })?
            .map_err(|status| BridgeError::HandlerFailure {
                message: status.message().to_string(),
            })?;

        let json = response
            .to_json()
            .map_err(|e| BridgeError::malformed(response.type_name(), e))?;

        info!(
            interaction_id = %interaction.id(),
            method = %resolved.method.path(),
            target = %target.name(),
            "Inbound request handled"
        );
        Ok(Bytes::from(json))
    }

    /// Dispatch a bridged request and render the outcome as an HTTP response.
    ///
    /// Never fails: every error becomes a 500 carrying `{"error": "..."}`.
    pub async fn handle<B: From<Bytes>>(
        &self,
        path: &str,
        query: Option<&str>,
        body: Bytes,
    ) -> Response<B> {
        let result = self.dispatch(path, query, body).await;
        Self::respond(path, result)
    }

    pub(crate) fn respond<B: From<Bytes>>(
        path: &str,
        result: Result<Bytes, BridgeError>,
    ) -> Response<B> {
        match result {
            Ok(json) => {
                let mut response = Response::new(B::from(json));
                *response.status_mut() = StatusCode::OK;
                response.headers_mut().insert(
                    header::CONTENT_TYPE,
                    header::HeaderValue::from_static("application/json"),
                );
                response
            }
            Err(err) => {
                error!(path = %path, kind = err.kind(), error = %err, "Inbound request failed");
                err.into_http_response()
            }
        }
    }
}

impl std::fmt::Debug for InboundBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundBridge")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example;
    use crate::server::config::DiscoveryStrategy;

    fn bridge(strategy: DiscoveryStrategy) -> InboundBridge {
        let mut registry = BridgeRegistry::new();
        example::register(&mut registry).unwrap();
        registry
            .register_controller(Arc::new(example::controller().unwrap()))
            .unwrap();
        let config = BridgeConfig::builder().discovery_strategy(strategy).build();
        InboundBridge::new(registry, config)
    }

    #[test]
    fn test_handles() {
        let bridge = bridge(DiscoveryStrategy::Convention);
        assert!(bridge.handles("/pact/Example/example_method"));
        assert!(!bridge.handles("/health"));
        assert!(!bridge.handles("/pactual/x/y"));
    }

    #[tokio::test]
    async fn test_dispatch() {
        let bridge = bridge(DiscoveryStrategy::Convention);
        let body = bridge
            .dispatch(
                "/pact/Example/example_method",
                Some("service=ExampleService&request=ExampleRequest"),
                Bytes::from_static(br#"{"name":"Ada"}"#),
            )
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"message":"Hello, Ada!"}"#);
    }

    #[tokio::test]
    async fn test_dispatch_malformed() {
        let bridge = bridge(DiscoveryStrategy::Convention);
        let err = bridge
            .dispatch(
                "/pact/Example/example_method",
                None,
                Bytes::from_static(b"not-json"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload { ref message_type, .. } if message_type == "example.ExampleRequest"));
    }

    #[tokio::test]
    async fn test_handler_status_is_handler_failure() {
        let bridge = bridge(DiscoveryStrategy::Convention);
        let err = bridge
            .dispatch(
                "/pact/Example/example_method",
                None,
                Bytes::from_static(br#"{"name":""}"#),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::HandlerFailure { ref message } if message == "name must not be empty"));
    }

    #[tokio::test]
    async fn test_config_strategy_without_binding() {
        let bridge = bridge(DiscoveryStrategy::Config);
        let err = bridge
            .dispatch(
                "/pact/Example/example_method",
                None,
                Bytes::from_static(br#"{"name":"Ada"}"#),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NoControllerRegistered(_)));
    }

    #[test]
    fn test_respond_error_envelope() {
        let response: Response<Bytes> = InboundBridge::respond(
            "/pact/Ghost/boo",
            Err(BridgeError::UnresolvableRoute("Ghost/boo".into())),
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "unresolvable route: Ghost/boo");
    }

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(panic.as_ref()), "boom");
        let panic: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(panic.as_ref()), "bang");
    }
}
