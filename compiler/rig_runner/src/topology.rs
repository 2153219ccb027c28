//! Factory-backed topology provider.

use std::sync::Arc;

use parking_lot::Mutex;
use rig_suite::{Resource, TopoKind, Topology, TopologyError};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

type Factory = Box<dyn Fn(&TopoKind) -> Result<Resource, TopologyError> + Send + Sync>;

#[derive(Default)]
struct Held {
    acquired: Vec<(TopoKind, Resource)>,
    terminations: usize,
}

/// A [`Topology`] that builds resources from per-kind factories.
///
/// Every `require` calls the kind's factory and holds on to the result until
/// the next `terminate`, which drops everything held.
#[derive(Default)]
pub struct StaticTopology {
    factories: FxHashMap<TopoKind, Factory>,
    held: Mutex<Held>,
}

impl StaticTopology {
    pub fn new() -> Self {
        StaticTopology::default()
    }

    /// Serve `kind` from `factory`.
    pub fn with_factory<F>(mut self, kind: impl Into<TopoKind>, factory: F) -> Self
    where
        F: Fn(&TopoKind) -> Result<Resource, TopologyError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
        self
    }

    /// Serve `kind` by sharing one existing resource.
    pub fn with_resource<R: Send + Sync + 'static>(
        self,
        kind: impl Into<TopoKind>,
        resource: Arc<R>,
    ) -> Self {
        self.with_factory(kind, move |_: &TopoKind| {
            let resource: Resource = resource.clone();
            Ok(resource)
        })
    }

    /// Kinds currently held, in acquisition order.
    pub fn held(&self) -> Vec<TopoKind> {
        self.held
            .lock()
            .acquired
            .iter()
            .map(|(kind, _)| kind.clone())
            .collect()
    }

    /// Number of `terminate` calls so far.
    pub fn terminations(&self) -> usize {
        self.held.lock().terminations
    }
}

impl Topology for StaticTopology {
    fn require(&self, kind: &TopoKind) -> Result<Resource, TopologyError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| TopologyError::NoMatch { kind: kind.clone() })?;
        let resource = factory(kind)?;
        debug!(%kind, "topology resource acquired");
        self.held
            .lock()
            .acquired
            .push((kind.clone(), Arc::clone(&resource)));
        Ok(resource)
    }

    fn terminate(&self) -> Result<(), TopologyError> {
        let mut held = self.held.lock();
        held.terminations += 1;
        let released = std::mem::take(&mut held.acquired);
        info!(released = released.len(), "topology terminated");
        Ok(())
    }
}
