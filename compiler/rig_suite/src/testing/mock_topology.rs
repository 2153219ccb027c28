//! Scripted topology provider.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::topology::{Resource, TopoKind, Topology, TopologyError};

#[derive(Default)]
struct Calls {
    required: Vec<TopoKind>,
    terminated: usize,
}

/// A [`Topology`] that serves preconfigured resources and records calls.
///
/// Kinds without a configured resource or failure yield
/// [`TopologyError::NoMatch`].
#[derive(Default)]
pub struct MockTopology {
    resources: FxHashMap<TopoKind, Resource>,
    failures: FxHashMap<TopoKind, TopologyError>,
    terminate_error: Option<TopologyError>,
    calls: Mutex<Calls>,
}

impl MockTopology {
    pub fn new() -> Self {
        MockTopology::default()
    }

    /// Serve `resource` for `kind`.
    pub fn with_resource<R: Send + Sync + 'static>(
        mut self,
        kind: impl Into<TopoKind>,
        resource: Arc<R>,
    ) -> Self {
        self.resources.insert(kind.into(), resource);
        self
    }

    /// Fail every `require` for `kind` with `error`.
    pub fn with_failure(mut self, kind: impl Into<TopoKind>, error: TopologyError) -> Self {
        self.failures.insert(kind.into(), error);
        self
    }

    /// Fail every `terminate` with `error` (still counted).
    pub fn with_terminate_error(mut self, error: TopologyError) -> Self {
        self.terminate_error = Some(error);
        self
    }

    /// Kinds passed to `require`, in call order.
    pub fn required(&self) -> Vec<TopoKind> {
        self.calls.lock().required.clone()
    }

    /// Number of `terminate` calls.
    pub fn terminated(&self) -> usize {
        self.calls.lock().terminated
    }
}

impl Topology for MockTopology {
    fn require(&self, kind: &TopoKind) -> Result<Resource, TopologyError> {
        self.calls.lock().required.push(kind.clone());
        if let Some(error) = self.failures.get(kind) {
            return Err(error.clone());
        }
        self.resources
            .get(kind)
            .cloned()
            .ok_or_else(|| TopologyError::NoMatch { kind: kind.clone() })
    }

    fn terminate(&self) -> Result<(), TopologyError> {
        self.calls.lock().terminated += 1;
        match &self.terminate_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
