pub mod client;
pub mod error;
pub mod example;
pub mod interaction;
pub mod message;
pub mod names;
pub mod registry;
pub mod server;
pub mod service_id;
pub mod settings;

pub use error::BridgeError;
pub use message::{DynMessage, JsonMessage};
pub use names::{BridgeRoute, MethodIdentifier};
pub use registry::BridgeRegistry;
pub use service_id::ServiceId;
pub use settings::Settings;
