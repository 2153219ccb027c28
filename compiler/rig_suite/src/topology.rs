//! Topology provider seam.
//!
//! A topology provider hands out shared physical or logical resources (a
//! controller, a set of devices under test) for the duration of a suite and
//! releases them when the suite ends. The core only ever calls `require` from
//! the synthetic before-all step and `terminate` from the synthetic after-all
//! step of each generated suite.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::step::StepError;

/// An acquired resource, as returned by a provider.
pub type Resource = Arc<dyn Any + Send + Sync>;

/// Provider handle shared by every generated suite.
pub type SharedTopology = Arc<dyn Topology>;

/// The kind of resource a suite asks for (e.g. `"controller-3dut"`).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TopoKind(String);

impl TopoKind {
    pub fn new(kind: impl Into<String>) -> Self {
        TopoKind(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopoKind {
    fn from(kind: &str) -> Self {
        TopoKind::new(kind)
    }
}

impl From<String> for TopoKind {
    fn from(kind: String) -> Self {
        TopoKind(kind)
    }
}

/// Errors raised by a topology provider.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// The provider has nothing that satisfies the requested kind.
    #[error("no topology resource matches `{kind}`")]
    NoMatch { kind: TopoKind },

    /// A matching resource exists but could not be acquired.
    #[error("failed to acquire `{kind}`: {reason}")]
    Acquire { kind: TopoKind, reason: String },

    /// Releasing the acquired resources failed.
    #[error("failed to terminate topology: {reason}")]
    Terminate { reason: String },
}

impl TopologyError {
    #[cold]
    pub fn acquire(kind: &TopoKind, reason: impl fmt::Display) -> Self {
        TopologyError::Acquire {
            kind: kind.clone(),
            reason: reason.to_string(),
        }
    }

    #[cold]
    pub fn terminate(reason: impl fmt::Display) -> Self {
        TopologyError::Terminate {
            reason: reason.to_string(),
        }
    }
}

/// External provider of suite-scoped resources.
pub trait Topology: Send + Sync {
    /// Acquire a resource matching `kind`.
    fn require(&self, kind: &TopoKind) -> Result<Resource, TopologyError>;

    /// Release everything this process acquired.
    ///
    /// Called once per generated suite, whether or not the suite bound a
    /// resource.
    fn terminate(&self) -> Result<(), TopologyError>;
}

/// Conversion from an untyped [`Resource`] into the type an injection setter
/// takes.
pub trait FromResource: Sized {
    fn from_resource(resource: Resource) -> Result<Self, StepError>;
}

impl<R: Any + Send + Sync> FromResource for Arc<R> {
    fn from_resource(resource: Resource) -> Result<Self, StepError> {
        resource.downcast::<R>().map_err(|_| StepError::ResourceType {
            expected: type_name::<R>(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Controller {
        ports: u8,
    }

    #[test]
    fn downcast_to_matching_type() {
        let resource: Resource = Arc::new(Controller { ports: 3 });
        let controller = Arc::<Controller>::from_resource(resource).unwrap();
        assert_eq!(controller.ports, 3);
    }

    #[test]
    fn downcast_mismatch_names_expected_type() {
        let resource: Resource = Arc::new(7_u32);
        let err = Arc::<Controller>::from_resource(resource).unwrap_err();
        assert!(matches!(err, StepError::ResourceType { expected } if expected.ends_with("Controller")));
    }

    #[test]
    fn error_messages() {
        let kind = TopoKind::new("controller-3dut");
        assert_eq!(
            TopologyError::NoMatch { kind: kind.clone() }.to_string(),
            "no topology resource matches `controller-3dut`"
        );
        assert_eq!(
            TopologyError::acquire(&kind, "busy").to_string(),
            "failed to acquire `controller-3dut`: busy"
        );
    }
}
