use bytes::Bytes;
use tracing::{error, info, warn};

use crate::client::broker::BrokerClient;
use crate::client::config::{FailurePolicy, InterceptMode, InterceptorConfig};
use crate::error::BridgeError;
use crate::interaction::TranscodedInteraction;
use crate::message::JsonMessage;
use crate::names::{self, MethodIdentifier};

/// What the call-dispatch layer should do with an intercepted call.
#[derive(Debug)]
pub enum Decision {
    /// Dispatch the call to the real service.
    Proceed,
    /// Answer the call with this JSON body instead of dispatching it.
    Reply(Bytes),
    /// Fail the call.
    Abort(BridgeError),
}

/// Re-expresses each outbound unary call as an HTTP/JSON interaction with the broker.
///
/// The broker exchange completes (or fails) before the call is dispatched: its status
/// code decides whether the interaction was accepted.
#[derive(Debug, Clone)]
pub struct PactInterceptor {
    config: InterceptorConfig,
    broker: BrokerClient,
}

impl PactInterceptor {
    pub fn new(config: InterceptorConfig) -> Self {
        let broker = BrokerClient::new(config.timeout);
        Self { config, broker }
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// Send `request` to the broker as the interaction for `method` and decide the call's fate.
    pub async fn intercept<M: JsonMessage>(
        &self,
        method: &MethodIdentifier,
        request: &M,
    ) -> Decision {
        let payload = match serde_json::to_vec(request) {
            Ok(payload) => Bytes::from(payload),
            Err(e) => return self.fail(method, BridgeError::malformed(M::full_name(), e)),
        };

        let route = names::to_route(method, Some(&M::full_name()));
        let interaction = TranscodedInteraction::outbound(route, payload);

        match self.exchange(method, &interaction).await {
            Ok(body) => match self.config.mode {
                InterceptMode::Forward => Decision::Proceed,
                InterceptMode::Replace => Decision::Reply(body),
            },
            Err(err) => self.fail(method, err),
        }
    }

    async fn exchange(
        &self,
        method: &MethodIdentifier,
        interaction: &TranscodedInteraction,
    ) -> Result<Bytes, BridgeError> {
        let url = self.config.broker_url(interaction.route())?;

        info!(
            interaction_id = %interaction.id(),
            method = %method,
            url = %url,
            "Sending interaction to broker"
        );

        let reply = self
            .broker
            .post_json(&url, interaction.payload().clone())
            .await?;

        if reply.status.as_u16() != self.config.success_status {
            return Err(BridgeError::BrokerRejected {
                status_code: reply.status.as_u16(),
                url: url.to_string(),
            });
        }

        info!(
            interaction_id = %interaction.id(),
            status = reply.status.as_u16(),
            "Broker accepted interaction"
        );
        Ok(reply.body)
    }

    fn fail(&self, method: &MethodIdentifier, err: BridgeError) -> Decision {
        error!(method = %method, kind = err.kind(), error = %err, "Broker interaction failed");

        // In replace mode the real service is never called, so there is nothing to continue to.
        match (self.config.mode, self.config.failure_policy) {
            (InterceptMode::Replace, _) | (_, FailurePolicy::Abort) => Decision::Abort(err),
            (InterceptMode::Forward, FailurePolicy::LogAndContinue) => {
                warn!(method = %method, "Continuing call despite broker failure");
                Decision::Proceed
            }
        }
    }
}
