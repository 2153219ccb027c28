//! Rig Suite - declarative test-suite compiler.
//!
//! Test classes describe their tests, lifecycle hooks and topology injection
//! one registration at a time. Registrations land in an [`Environment`] keyed
//! by class identity, and each class's [`Suite`] is later compiled into a
//! single grouped suite on an external [`Runner`].
//!
//! # Architecture
//!
//! ```text
//! #[suite] / registration calls
//!     │
//!     ▼
//! Environment ──► Suite<T> (per ClassId, created lazily)
//!     │
//!     ▼
//! generate() ──► CompiledSuite ──► Runner::describe / hook / test
//! ```
//!
//! Registration order is free; emission order is fixed:
//!
//! 1. topology acquire (before-all, 60 s)
//! 2. topology terminate (after-all, 60 s)
//! 3. user before-all, user after-all
//! 4. user before-each, user after-each
//! 5. tests, then exclusive tests
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rig_suite::{suite, Environment};
//!
//! #[derive(Default)]
//! struct LinkSuite {
//!     rig: Option<Arc<Controller>>,
//! }
//!
//! #[suite("Link Tests")]
//! impl LinkSuite {
//!     #[inject_topo("controller-3dut")]
//!     fn rig(&mut self, rig: Arc<Controller>) {
//!         self.rig = Some(rig);
//!     }
//!
//!     #[test_case("link is up", timeout = 5000)]
//!     fn check_link(&mut self) { /* ... */ }
//! }
//!
//! let mut env = Environment::new();
//! env.compile_declared::<LinkSuite>(&mut runner, &topology)?;
//! ```

mod class_id;
mod environment;
mod runner;
mod step;
mod suite;
pub mod testing;
mod topology;

pub use class_id::{ClassId, Fixture};
pub use environment::{
    declare, environment, generate, generate_declared, DeclaredSuite, Environment,
};
pub use runner::{HookKind, Runner, TestMode};
pub use step::{IntoStepResult, Step, StepError, StepResult};
pub use suite::{
    CompiledSuite, Emission, HookEntry, Suite, SuiteError, TestEntry, TopoBinding,
    TOPOLOGY_TIMEOUT,
};
pub use topology::{FromResource, Resource, SharedTopology, TopoKind, Topology, TopologyError};

// Decorator layer
pub use rig_macros::suite;
