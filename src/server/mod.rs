//! Inbound side: HTTP/JSON requests from the broker replayed as RPC invocations.
//!
//! A request to `/<prefix>/<ServiceSegment>/<snake_action>[?service=..&request=..]`
//! is resolved against the [`BridgeRegistry`](crate::registry::BridgeRegistry), its
//! body decoded into the method's request type, and the method invoked on the target
//! the configured [`ServiceLocator`] picks. Any other path goes to the wrapped service.
//!
//! ```ignore
//! use pact_grpc_bridge::server::{BridgeConfig, InboundBridge, PactBridgeLayer};
//!
//! let bridge = InboundBridge::new(registry, BridgeConfig::default());
//! let downstream = axum::Router::new().route("/health", get(|| async { "ok" }));
//! let app = PactBridgeLayer::new(bridge).layer(downstream);
//! ```

mod bridge;
mod config;
mod controller;
mod layer;
mod locator;
mod target;

pub use bridge::InboundBridge;
pub use config::{BridgeConfig, DEFAULT_MAX_BODY_BYTES, DiscoveryStrategy};
pub use controller::Controller;
pub use layer::{PactBridgeLayer, PactBridgeService};
pub use locator::{
    CONTROLLER_SUFFIX, ConfigLocator, ConventionLocator, ReflectionLocator, SERVICE_SUFFIX,
    ServiceLocator, controller_name_for,
};
pub use target::{InvocableTarget, StubTarget};
