use bon::Builder;

/// Default bound on a bridged request body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
use serde::{Deserialize, Serialize};

/// How the inbound bridge finds the target for a resolved service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStrategy {
    /// `FooService` is served by the controller named `FooController`.
    #[default]
    Convention,
    /// Services are served by the targets explicitly bound to them.
    Config,
    /// Services are served by the first controller implementing all of their methods.
    Reflection,
}

/// Configuration for the inbound bridge.
#[derive(Debug, Clone, Builder)]
pub struct BridgeConfig {
    /// First path segment of every bridged route. Other paths pass through.
    #[builder(default = "pact".to_string())]
    pub bridge_prefix: String,

    #[builder(default)]
    pub discovery_strategy: DiscoveryStrategy,

    /// Bridged request bodies larger than this are rejected before parsing.
    #[builder(default = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
