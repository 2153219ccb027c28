//! Per-class suite entry.
//!
//! A `Suite<T>` accumulates everything registered for one test class: tests,
//! exclusive tests, the four hook tables and an optional topology binding.
//! Each table is keyed by method name and keeps insertion order. Registering a
//! name twice replaces the earlier payload in place, so the entry keeps the
//! position of its first registration.
//!
//! `generate` compiles the tables into one grouped suite on a [`Runner`]. The
//! emission order is fixed and independent of registration order:
//!
//! 1. `describe(title)`
//! 2. topology acquire (before-all, [`TOPOLOGY_TIMEOUT`])
//! 3. topology terminate (after-all, [`TOPOLOGY_TIMEOUT`])
//! 4. user before-all hooks, then user after-all hooks
//! 5. user before-each hooks, then user after-each hooks
//! 6. tests, then exclusive tests

mod context;

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace, warn};

use crate::class_id::{ClassId, Fixture};
use crate::runner::{HookKind, Runner, TestMode};
use crate::step::{IntoStepResult, Step, StepError, StepResult};
use crate::topology::{Resource, SharedTopology, TopoKind};

use context::SuiteContext;

/// Timeout for the synthetic topology acquire and terminate steps.
pub const TOPOLOGY_TIMEOUT: Duration = Duration::from_secs(60);

type Callable<T> = Arc<dyn Fn(&mut T) -> StepResult + Send + Sync>;
type Assign<T> = Arc<dyn Fn(&mut T, Resource) -> StepResult + Send + Sync>;
type MethodTable<E> = IndexMap<&'static str, E, FxBuildHasher>;

/// A registered test.
pub struct TestEntry<T> {
    method: &'static str,
    message: String,
    timeout: Option<Duration>,
    callable: Callable<T>,
}

impl<T> TestEntry<T> {
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Title the test is registered under.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Timeout forwarded verbatim to the runner.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// A registered lifecycle hook.
pub struct HookEntry<T> {
    method: &'static str,
    callable: Callable<T>,
}

impl<T> HookEntry<T> {
    pub fn method(&self) -> &'static str {
        self.method
    }
}

/// Where the acquired topology resource goes.
pub struct TopoBinding<T> {
    property: &'static str,
    kind: TopoKind,
    assign: Assign<T>,
}

impl<T> TopoBinding<T> {
    pub fn property(&self) -> &'static str {
        self.property
    }

    pub fn kind(&self) -> &TopoKind {
        &self.kind
    }
}

impl<T> Clone for TopoBinding<T> {
    fn clone(&self) -> Self {
        TopoBinding {
            property: self.property,
            kind: self.kind.clone(),
            assign: Arc::clone(&self.assign),
        }
    }
}

/// Precondition violations on a suite.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    /// `generate` already ran for this class; emitting again would define the
    /// suite twice.
    #[error("suite `{class}` was already generated")]
    AlreadyGenerated { class: ClassId },
}

/// All metadata registered for one test class.
pub struct Suite<T> {
    class: ClassId,
    title: Option<String>,
    tests: MethodTable<TestEntry<T>>,
    exclusive_tests: MethodTable<TestEntry<T>>,
    hooks: [MethodTable<HookEntry<T>>; 4],
    topo: Option<TopoBinding<T>>,
    generated: bool,
}

impl<T: Fixture> Suite<T> {
    pub fn new() -> Self {
        Suite {
            class: ClassId::of::<T>(),
            title: None,
            tests: MethodTable::default(),
            exclusive_tests: MethodTable::default(),
            hooks: std::array::from_fn(|_| MethodTable::default()),
            topo: None,
            generated: false,
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Set the suite title, replacing any earlier one.
    pub fn message(&mut self, text: impl Into<String>) -> &mut Self {
        self.note_late("message");
        self.title = Some(text.into());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Register a test.
    pub fn add_test<R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
        message: impl Into<String>,
        timeout: Option<Duration>,
    ) {
        self.insert_test(TestMode::Normal, method, erase(callable), message.into(), timeout);
    }

    /// Register an exclusive test.
    pub fn add_test_only<R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
        message: impl Into<String>,
        timeout: Option<Duration>,
    ) {
        self.insert_test(TestMode::Exclusive, method, erase(callable), message.into(), timeout);
    }

    /// Register a lifecycle hook of the given kind.
    pub fn add_hook<R: IntoStepResult>(
        &mut self,
        kind: HookKind,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.note_late(kind.as_str());
        let entry = HookEntry {
            method,
            callable: erase(callable),
        };
        if self.hooks[kind.index()].insert(method, entry).is_some() {
            debug!(class = %self.class, method, hook = %kind, "hook re-registered; replacing");
        } else {
            trace!(class = %self.class, method, hook = %kind, "hook registered");
        }
    }

    pub fn add_before_all<R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.add_hook(HookKind::BeforeAll, method, callable);
    }

    pub fn add_after_all<R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.add_hook(HookKind::AfterAll, method, callable);
    }

    pub fn add_before_each<R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.add_hook(HookKind::BeforeEach, method, callable);
    }

    pub fn add_after_each<R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.add_hook(HookKind::AfterEach, method, callable);
    }

    /// Bind the suite's topology resource to `property`.
    ///
    /// `assign` receives the resource acquired for `kind` once the suite has
    /// started. Only one binding exists per suite; the last call wins.
    pub fn inject_topo(
        &mut self,
        property: &'static str,
        kind: impl Into<TopoKind>,
        assign: impl Fn(&mut T, Resource) -> StepResult + Send + Sync + 'static,
    ) {
        self.note_late("topology injection");
        let kind = kind.into();
        if let Some(previous) = &self.topo {
            debug!(
                class = %self.class,
                previous = previous.property,
                property,
                "topology binding replaced"
            );
        }
        trace!(class = %self.class, property, %kind, "topology bound");
        self.topo = Some(TopoBinding {
            property,
            kind,
            assign: Arc::new(assign),
        });
    }

    pub fn tests(&self) -> impl ExactSizeIterator<Item = &TestEntry<T>> {
        self.tests.values()
    }

    pub fn exclusive_tests(&self) -> impl ExactSizeIterator<Item = &TestEntry<T>> {
        self.exclusive_tests.values()
    }

    pub fn hooks(&self, kind: HookKind) -> impl ExactSizeIterator<Item = &HookEntry<T>> {
        self.hooks[kind.index()].values()
    }

    pub fn topo_binding(&self) -> Option<&TopoBinding<T>> {
        self.topo.as_ref()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Compile the tables and register the result with `runner`.
    pub fn generate(
        &mut self,
        runner: &mut dyn Runner,
        topology: &SharedTopology,
    ) -> Result<(), SuiteError> {
        self.compile(topology)?.emit(runner);
        Ok(())
    }

    /// Compile the tables into an ordered list of emissions without touching
    /// a runner. Marks the suite generated.
    pub fn compile(&mut self, topology: &SharedTopology) -> Result<CompiledSuite, SuiteError> {
        if self.generated {
            return Err(SuiteError::AlreadyGenerated { class: self.class });
        }
        self.generated = true;

        let ctx = SuiteContext::<T>::new();
        let hook_count: usize = self.hooks.iter().map(IndexMap::len).sum();
        let mut emissions =
            Vec::with_capacity(2 + hook_count + self.tests.len() + self.exclusive_tests.len());

        emissions.push(Emission::Hook {
            kind: HookKind::BeforeAll,
            method: None,
            step: acquire_step(ctx.clone(), Arc::clone(topology), self.topo.clone()),
            timeout: Some(TOPOLOGY_TIMEOUT),
        });
        emissions.push(Emission::Hook {
            kind: HookKind::AfterAll,
            method: None,
            step: terminate_step(ctx.clone(), Arc::clone(topology)),
            timeout: Some(TOPOLOGY_TIMEOUT),
        });

        for kind in HookKind::ALL {
            for hook in self.hooks[kind.index()].values() {
                emissions.push(Emission::Hook {
                    kind,
                    method: Some(hook.method),
                    step: bind(&ctx, &hook.callable),
                    timeout: None,
                });
            }
        }

        let tests = self.tests.values().map(|t| (TestMode::Normal, t));
        let exclusive = self.exclusive_tests.values().map(|t| (TestMode::Exclusive, t));
        for (mode, test) in tests.chain(exclusive) {
            emissions.push(Emission::Test {
                title: test.message.clone(),
                method: test.method,
                mode,
                step: bind(&ctx, &test.callable),
                timeout: test.timeout,
            });
        }

        debug!(
            class = %self.class,
            title = self.title.as_deref().unwrap_or("<untitled>"),
            hooks = hook_count,
            tests = self.tests.len(),
            exclusive = self.exclusive_tests.len(),
            topology = self.topo.as_ref().map(|b| b.kind.as_str()),
            "suite compiled"
        );

        Ok(CompiledSuite {
            class: self.class,
            title: self.title.clone(),
            emissions,
        })
    }

    fn insert_test(
        &mut self,
        mode: TestMode,
        method: &'static str,
        callable: Callable<T>,
        message: String,
        timeout: Option<Duration>,
    ) {
        self.note_late("test");
        let table = match mode {
            TestMode::Normal => &mut self.tests,
            TestMode::Exclusive => &mut self.exclusive_tests,
        };
        let entry = TestEntry {
            method,
            message,
            timeout,
            callable,
        };
        if table.insert(method, entry).is_some() {
            debug!(class = %self.class, method, ?mode, "test re-registered; replacing");
        } else {
            trace!(class = %self.class, method, ?mode, "test registered");
        }
    }

    fn note_late(&self, what: &str) {
        if self.generated {
            warn!(
                class = %self.class,
                what,
                "registration after generate; the emitted suite will not see it"
            );
        }
    }
}

impl<T: Fixture> Default for Suite<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One registration a compiled suite makes on its runner.
pub enum Emission {
    Hook {
        kind: HookKind,
        /// `None` for the synthetic topology steps.
        method: Option<&'static str>,
        step: Step,
        timeout: Option<Duration>,
    },
    Test {
        title: String,
        method: &'static str,
        mode: TestMode,
        step: Step,
        timeout: Option<Duration>,
    },
}

impl Emission {
    /// Whether this is one of the two synthetic topology steps.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Emission::Hook { method: None, .. })
    }
}

/// A suite whose registrations are fixed but not yet handed to a runner.
///
/// Splitting compile from emit lets a shared registry release its lock before
/// the runner is driven.
pub struct CompiledSuite {
    class: ClassId,
    title: Option<String>,
    emissions: Vec<Emission>,
}

impl CompiledSuite {
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn emissions(&self) -> &[Emission] {
        &self.emissions
    }

    /// Register everything with `runner` inside one `describe` scope.
    pub fn emit(self, runner: &mut dyn Runner) {
        let CompiledSuite {
            class,
            title,
            emissions,
        } = self;
        debug!(%class, count = emissions.len(), "emitting suite");

        // A runner may invoke the body more than once; only the first call
        // receives the registrations.
        let mut pending = Some(emissions);
        runner.describe(title.as_deref(), &mut |scope: &mut dyn Runner| {
            for emission in pending.take().into_iter().flatten() {
                match emission {
                    Emission::Hook {
                        kind,
                        step,
                        timeout,
                        ..
                    } => scope.hook(kind, step, timeout),
                    Emission::Test {
                        title,
                        mode,
                        step,
                        timeout,
                        ..
                    } => scope.test(&title, mode, step, timeout),
                }
            }
        });
    }
}

fn erase<T: 'static, R: IntoStepResult>(
    callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
) -> Callable<T> {
    Arc::new(move |fixture: &mut T| callable(fixture).into_step_result())
}

fn bind<T: Fixture>(ctx: &SuiteContext<T>, callable: &Callable<T>) -> Step {
    let ctx = ctx.clone();
    let callable = Arc::clone(callable);
    Box::new(move || ctx.with(|fixture| callable(fixture))?)
}

/// Suite start: build the fixture, then acquire and inject the bound resource.
fn acquire_step<T: Fixture>(
    ctx: SuiteContext<T>,
    topology: SharedTopology,
    binding: Option<TopoBinding<T>>,
) -> Step {
    Box::new(move || {
        ctx.start();
        let Some(binding) = &binding else {
            return Ok(());
        };
        debug!(kind = %binding.kind, property = binding.property, "acquiring topology");
        let resource = topology.require(&binding.kind).map_err(StepError::from)?;
        ctx.with(|fixture| (binding.assign)(fixture, resource))?
    })
}

/// Suite end: release the topology unconditionally, then drop the fixture.
fn terminate_step<T: Fixture>(ctx: SuiteContext<T>, topology: SharedTopology) -> Step {
    Box::new(move || {
        debug!("terminating topology");
        let released = topology.terminate();
        ctx.finish();
        released.map_err(StepError::from)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
