use crate::error::BridgeError;

/// Errors raised while building a [`BridgeRegistry`](super::BridgeRegistry) at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A method, controller or binding with the same key already exists.
    #[error("{kind} '{name}' is already registered")]
    AlreadyRegistered { kind: &'static str, name: String },

    /// The service or method name does not form a valid gRPC method path.
    #[error(transparent)]
    InvalidMethod(#[from] BridgeError),
}

impl RegistryError {
    pub(crate) fn already_registered(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            kind,
            name: name.into(),
        }
    }
}
