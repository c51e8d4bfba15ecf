use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BridgeError;
use crate::names::BridgeRoute;

/// What happens to the real RPC once the broker accepted the interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptMode {
    /// The broker is informed first, then the call proceeds to the real service.
    #[default]
    Forward,
    /// The broker answers in place of the real service; its body is the RPC response.
    Replace,
}

/// What happens to the RPC when the broker exchange fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the RPC with the broker error.
    #[default]
    Abort,
    /// Log the broker error and let the RPC proceed.
    ///
    /// Only applies in [`InterceptMode::Forward`]; replace mode always fails the RPC.
    LogAndContinue,
}

/// Configuration for the outbound interceptor.
#[derive(Debug, Clone, Builder)]
pub struct InterceptorConfig {
    #[builder(default = "localhost".to_string())]
    pub broker_host: String,

    #[builder(default = 1234)]
    pub broker_port: u16,

    /// First path segment of every broker route.
    #[builder(default = "pact".to_string())]
    pub bridge_prefix: String,

    /// The only broker status treated as acceptance.
    #[builder(default = 200)]
    pub success_status: u16,

    /// Bound on the whole broker exchange, connect included.
    #[builder(default = Duration::from_secs(5))]
    pub timeout: Duration,

    #[builder(default)]
    pub mode: InterceptMode,

    #[builder(default)]
    pub failure_policy: FailurePolicy,
}

impl InterceptorConfig {
    /// Build `http://<host>:<port>/<prefix>/<segment>/<action>[?service=..&request=..]`.
    pub(crate) fn broker_url(&self, route: &BridgeRoute) -> Result<Url, BridgeError> {
        let base = format!("http://{}:{}", self.broker_host, self.broker_port);
        let mut url = Url::parse(&base).map_err(|e| BridgeError::BrokerUnreachable {
            url: base.clone(),
            reason: e.to_string(),
        })?;

        url.set_path(&route.path(&self.bridge_prefix));
        let pairs = route.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{MethodIdentifier, to_route};

    #[test]
    fn test_defaults() {
        let config = InterceptorConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1234);
        assert_eq!(config.bridge_prefix, "pact");
        assert_eq!(config.success_status, 200);
        assert_eq!(config.mode, InterceptMode::Forward);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_broker_url() {
        let config = InterceptorConfig::builder().broker_port(4321).build();
        let method = MethodIdentifier::parse("/user.UserService/GetUser").unwrap();
        let url = config
            .broker_url(&to_route(&method, Some("user.GetUserRequest")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:4321/pact/User/get_user?service=UserService&request=GetUserRequest"
        );
    }
}
