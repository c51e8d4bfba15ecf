//! Process-level settings for the binaries, layered with figment.
//!
//! Later layers override earlier ones:
//! 1. built-in defaults
//! 2. a TOML file (`pact-bridge.toml`, or the path in `PACT_BRIDGE_CONFIG`), if present
//! 3. `PACT_BRIDGE_*` environment variables, e.g. `PACT_BRIDGE_BROKER_PORT=9292`

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{FailurePolicy, InterceptMode, InterceptorConfig};
use crate::server::{BridgeConfig, DEFAULT_MAX_BODY_BYTES, DiscoveryStrategy};

pub const DEFAULT_CONFIG_FILE: &str = "pact-bridge.toml";
pub const CONFIG_PATH_ENV: &str = "PACT_BRIDGE_CONFIG";
pub const ENV_PREFIX: &str = "PACT_BRIDGE_";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for SettingsError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub broker_host: String,
    pub broker_port: u16,
    pub bridge_prefix: String,
    pub discovery_strategy: DiscoveryStrategy,
    /// `host:port` of the real gRPC service stubs are bound to.
    pub target_service_host: String,
    /// Where `pact-bridge` listens for broker requests.
    pub listen_addr: SocketAddr,
    pub broker_timeout_secs: u64,
    pub success_status: u16,
    pub intercept_mode: InterceptMode,
    pub failure_policy: FailurePolicy,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_owned(),
            broker_port: 1234,
            bridge_prefix: "pact".to_owned(),
            discovery_strategy: DiscoveryStrategy::default(),
            target_service_host: "localhost:50051".to_owned(),
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            broker_timeout_secs: 5,
            success_status: 200,
            intercept_mode: InterceptMode::default(),
            failure_policy: FailurePolicy::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    /// Load from the file named by `PACT_BRIDGE_CONFIG`, falling back to `pact-bridge.toml`.
    pub fn load() -> Result<Self, SettingsError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_owned());
        Self::load_from(path)
    }

    /// Load with `path` as the file layer. A missing file is skipped.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        Ok(Self::figment(path).extract()?)
    }

    /// Parse settings from a TOML string over the defaults, ignoring the environment.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(content))
            .extract()?)
    }

    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn broker_timeout(&self) -> Duration {
        Duration::from_secs(self.broker_timeout_secs)
    }

    pub fn interceptor_config(&self) -> InterceptorConfig {
        InterceptorConfig::builder()
            .broker_host(self.broker_host.clone())
            .broker_port(self.broker_port)
            .bridge_prefix(self.bridge_prefix.clone())
            .success_status(self.success_status)
            .timeout(self.broker_timeout())
            .mode(self.intercept_mode)
            .failure_policy(self.failure_policy)
            .build()
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig::builder()
            .bridge_prefix(self.bridge_prefix.clone())
            .discovery_strategy(self.discovery_strategy)
            .max_body_bytes(self.max_body_bytes)
            .build()
    }
}
