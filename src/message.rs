//! JSON-capable protobuf messages and their type-erased form.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A protobuf message that can also be carried as JSON.
///
/// Implemented for every `prost` message that derives `serde` and names itself
/// through [`prost::Name`].
pub trait JsonMessage:
    prost::Message
    + prost::Name
    + Serialize
    + DeserializeOwned
    + Default
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
}

impl<T> JsonMessage for T where
    T: prost::Message
        + prost::Name
        + Serialize
        + DeserializeOwned
        + Default
        + fmt::Debug
        + Send
        + Sync
        + 'static
{
}

trait ErasedMessage: Send + Sync + fmt::Debug {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: JsonMessage> ErasedMessage for M {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A decoded message whose concrete type is only known through its type name.
#[derive(Debug)]
pub struct DynMessage {
    type_name: String,
    inner: Box<dyn ErasedMessage>,
}

impl DynMessage {
    pub fn new<M: JsonMessage>(message: M) -> Self {
        Self {
            type_name: M::full_name(),
            inner: Box::new(message),
        }
    }

    /// Decode JSON bytes into `M`.
    pub fn decode_json<M: JsonMessage>(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice::<M>(bytes).map(Self::new)
    }

    /// Fully-qualified protobuf type name, e.g. `user.GetUserRequest`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        self.inner.to_json()
    }

    /// Recover the concrete message, or hand `self` back if the type does not match.
    pub fn downcast<M: JsonMessage>(mut self) -> Result<M, Self> {
        if let Some(message) = self.inner.as_any_mut().downcast_mut::<M>() {
            return Ok(std::mem::take(message));
        }
        Err(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::example::{ExampleRequest, ExampleResponse};

    #[test]
    fn test_decode_and_downcast() {
        let message = DynMessage::decode_json::<ExampleRequest>(br#"{"name":"Ada"}"#).unwrap();
        assert_eq!(message.type_name(), "example.ExampleRequest");

        let request: ExampleRequest = message.downcast().unwrap();
        assert_eq!(request.name, "Ada");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let message = DynMessage::decode_json::<ExampleRequest>(b"{}").unwrap();
        let request: ExampleRequest = message.downcast().unwrap();
        assert_eq!(request.name, "");
    }

    #[test]
    fn test_downcast_to_wrong_type_returns_message() {
        let message = DynMessage::new(ExampleRequest {
            name: "Ada".into(),
        });
        let message = message.downcast::<ExampleResponse>().unwrap_err();
        assert_eq!(message.type_name(), "example.ExampleRequest");
        assert_eq!(message.to_json().unwrap(), br#"{"name":"Ada"}"#);
    }

    #[test]
    fn test_debug_shows_inner_message() {
        let message = DynMessage::new(ExampleRequest {
            name: "Ada".into(),
        });
        let rendered = format!("{message:?}");
        assert!(rendered.contains("example.ExampleRequest"));
        assert!(rendered.contains("Ada"));
    }
}
