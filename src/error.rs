use bytes::Bytes;
use http::{Response, StatusCode, header};
use thiserror::Error;
use tonic::Status;

/// Errors that can occur while bridging a call in either direction.
///
/// Every variant is terminal for the call or request it occurred in.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The broker could not be reached (connection refused, timeout, I/O failure).
    #[error("broker unreachable at {url}: {reason}")]
    BrokerUnreachable { url: String, reason: String },

    /// The broker answered with something other than the configured success code.
    #[error("broker rejected interaction with status {status_code} ({url})")]
    BrokerRejected { status_code: u16, url: String },

    /// An inbound route could not be mapped to a registered service, method or message type.
    #[error("unresolvable route: {0}")]
    UnresolvableRoute(String),

    /// The JSON body does not decode into the target message type.
    #[error("{reason}")]
    MalformedPayload { message_type: String, reason: String },

    /// The service locator found no invocable target for the service.
    #[error("no controller registered for service: {0}")]
    NoControllerRegistered(String),

    /// The invoked target failed while handling the request.
    #[error("{message}")]
    HandlerFailure { message: String },

    /// An outbound method string was not of the form `/package.Service/Method`.
    #[error("invalid gRPC method path: {0}")]
    InvalidMethodPath(String),
}

impl BridgeError {
    pub(crate) fn malformed(message_type: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            message_type: message_type.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable label for the `kind` log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BrokerUnreachable { .. } => "broker_unreachable",
            Self::BrokerRejected { .. } => "broker_rejected",
            Self::UnresolvableRoute(_) => "unresolvable_route",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::NoControllerRegistered(_) => "no_controller_registered",
            Self::HandlerFailure { .. } => "handler_failure",
            Self::InvalidMethodPath(_) => "invalid_method_path",
        }
    }

    /// The `{"error": "..."}` envelope returned for every failed bridged request.
    pub fn to_json_bytes(&self) -> Bytes {
        let envelope = serde_json::json!({ "error": self.to_string() });
        Bytes::from(envelope.to_string())
    }

    /// Convert into the HTTP 500 response the inbound bridge sends back.
    pub fn into_http_response<B: From<Bytes>>(self) -> Response<B> {
        let mut response = Response::new(B::from(self.to_json_bytes()));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl From<BridgeError> for Status {
    fn from(err: BridgeError) -> Self {
        let message = err.to_string();
        match err {
            BridgeError::BrokerUnreachable { .. } => Status::unavailable(message),
            BridgeError::BrokerRejected { .. } => Status::aborted(message),
            BridgeError::InvalidMethodPath(_) | BridgeError::MalformedPayload { .. } => {
                Status::invalid_argument(message)
            }
            BridgeError::UnresolvableRoute(_)
            | BridgeError::NoControllerRegistered(_)
            | BridgeError::HandlerFailure { .. } => Status::internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_envelope_shape() {
        let err = BridgeError::NoControllerRegistered("user.UserService".into());
        let body: serde_json::Value = serde_json::from_slice(&err.to_json_bytes()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "no controller registered for service: user.UserService" })
        );
    }

    #[test]
    fn test_malformed_payload_displays_reason_only() {
        let err = BridgeError::malformed("user.GetUserRequest", "expected value at line 1 column 1");
        assert_eq!(err.to_string(), "expected value at line 1 column 1");
    }

    #[test]
    fn test_http_response_is_500_json() {
        let response: Response<Bytes> =
            BridgeError::UnresolvableRoute("/pact/x".into()).into_http_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_status_codes() {
        let unreachable = BridgeError::BrokerUnreachable {
            url: "http://localhost:1234/pact".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(Status::from(unreachable).code(), Code::Unavailable);

        let rejected = BridgeError::BrokerRejected {
            status_code: 503,
            url: "http://localhost:1234/pact".into(),
        };
        assert_eq!(Status::from(rejected).code(), Code::Aborted);

        let invalid = BridgeError::InvalidMethodPath("nope".into());
        assert_eq!(Status::from(invalid).code(), Code::InvalidArgument);
    }
}
