use std::fmt::Display;
use std::sync::Arc;

/// The fully-qualified name of a gRPC service, e.g. `user.UserService`.
///
/// Cheap to clone; used as the key for service descriptors and explicit bindings.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServiceId(Arc<str>);

impl ServiceId {
    /// Create a new [`ServiceId`] from any type that can be converted into an `Arc<str>`.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The dot-separated package segments preceding the service name.
    pub fn package(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.0.split('.').collect();
        segments.pop();
        segments
    }

    /// The last dot-segment, e.g. `UserService` for `user.UserService`.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ServiceId {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for ServiceId {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}
