//! Outbound side: client-issued unary calls re-expressed as broker interactions.
//!
//! Every call made through a [`BridgedClient`] is first serialized to JSON and POSTed
//! to the broker at `http://<host>:<port>/<prefix>/<ServiceSegment>/<snake_action>`
//! with `service=` and `request=` discriminators. Depending on the
//! [`InterceptMode`], the call then proceeds to the real service or is answered from
//! the broker's reply.
//!
//! ```ignore
//! use pact_grpc_bridge::client::{BridgedClient, InterceptMode, InterceptorConfig};
//!
//! let config = InterceptorConfig::builder()
//!     .broker_port(1234)
//!     .mode(InterceptMode::Forward)
//!     .build();
//!
//! let mut client = BridgedClient::connect_lazy("localhost:50051", config)?;
//! let response: tonic::Response<GetUserResponse> = client
//!     .unary("/user.UserService/GetUser", GetUserRequest { id: "42".into() })
//!     .await?;
//! ```

mod bridged;
mod broker;
mod config;
mod interceptor;

pub use bridged::{BridgedClient, UnaryTransport};
pub use broker::{BrokerClient, BrokerReply};
pub use config::{FailurePolicy, InterceptMode, InterceptorConfig};
pub use interceptor::{Decision, PactInterceptor};
