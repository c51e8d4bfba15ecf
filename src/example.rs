//! The `example.ExampleService` contract bridged by the binaries.

use serde::{Deserialize, Serialize};
use tonic::Status;

use crate::registry::{BridgeRegistry, RegistryError};
use crate::server::Controller;

pub const SERVICE: &str = "example.ExampleService";
pub const EXAMPLE_METHOD: &str = "ExampleMethod";

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExampleRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}

impl ::prost::Name for ExampleRequest {
    const NAME: &'static str = "ExampleRequest";
    const PACKAGE: &'static str = "example";
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExampleResponse {
    #[prost(string, tag = "1")]
    pub message: ::prost::alloc::string::String,
}

impl ::prost::Name for ExampleResponse {
    const NAME: &'static str = "ExampleResponse";
    const PACKAGE: &'static str = "example";
}

/// Register the `ExampleService` methods and message types.
pub fn register(registry: &mut BridgeRegistry) -> Result<(), RegistryError> {
    registry.register_method::<ExampleRequest, ExampleResponse>(SERVICE, EXAMPLE_METHOD)
}

/// An in-process `ExampleController` answering `Hello, <name>!`.
pub fn controller() -> Result<Controller, RegistryError> {
    let mut controller = Controller::new("ExampleController");
    controller.register::<ExampleRequest, ExampleResponse, _, _>(
        EXAMPLE_METHOD,
        |request| async move {
            if request.name.is_empty() {
                return Err(Status::invalid_argument("name must not be empty"));
            }
            Ok(ExampleResponse {
                message: format!("Hello, {}!", request.name),
            })
        },
    )?;
    Ok(controller)
}
