use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use pact_grpc_bridge::example;
use pact_grpc_bridge::registry::BridgeRegistry;
use pact_grpc_bridge::server::{InboundBridge, PactBridgeLayer, StubTarget};
use pact_grpc_bridge::service_id::ServiceId;
use pact_grpc_bridge::settings::Settings;
use tower::Layer;
use tower::make::Shared;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let settings = Settings::load()?;

    let mut registry = BridgeRegistry::new();
    example::register(&mut registry)?;

    // Every registered service is served by a stub to the real service, found by
    // convention and reflection through the catalog and by config through a binding.
    let service_ids: Vec<ServiceId> = registry.services().map(|s| s.id().clone()).collect();
    for id in service_ids {
        let Some(service) = registry.service(&id) else {
            continue;
        };
        let stub = Arc::new(StubTarget::connect_lazy(&settings.target_service_host, service)?);
        registry.register_controller(stub.clone())?;
        registry.bind_service(id.clone(), stub)?;
        info!(service = %id, target = %settings.target_service_host, "Stub bound");
    }

    let bridge = InboundBridge::new(registry, settings.bridge_config());
    let downstream = Router::new().route("/health", get(|| async { "ok" }));
    // Wrapped around the router rather than added with `Router::layer`, so unrouted
    // bridge paths reach the bridge instead of the fallback.
    let app = PactBridgeLayer::new(bridge).layer(downstream);

    let listener = tokio::net::TcpListener::bind(settings.listen_addr).await?;
    info!(
        addr = %settings.listen_addr,
        prefix = %settings.bridge_prefix,
        strategy = ?settings.discovery_strategy,
        "Bridge listening"
    );
    axum::serve(listener, Shared::new(app)).await?;

    Ok(())
}
