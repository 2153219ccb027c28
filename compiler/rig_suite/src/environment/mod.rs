//! Suite registry.
//!
//! The `Environment` maps each [`ClassId`] to its [`Suite`], creating suites
//! lazily on first registration. It is the single entry point for decorator
//! call sites: they report metadata without knowing whether the suite for
//! their class exists yet.
//!
//! A process-wide instance is available through [`environment`]; tests and
//! embedders can also own private instances.

use std::any::Any;
use std::sync::LazyLock;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::class_id::{ClassId, Fixture};
use crate::runner::Runner;
use crate::step::{IntoStepResult, StepResult};
use crate::suite::{CompiledSuite, Suite, SuiteError};
use crate::topology::{Resource, SharedTopology, TopoKind};

/// A fixture type whose registrations are declared by the `#[suite]` macro.
pub trait DeclaredSuite: Fixture {
    /// Title from `#[suite("...")]`, if one was given.
    const TITLE: Option<&'static str>;

    /// Issue every registration the type declares.
    fn declare(env: &mut Environment);
}

/// Registry of suites, one per class.
#[derive(Default)]
pub struct Environment {
    /// Each value is a `Suite<T>` for the `T` its key was built from.
    suites: FxHashMap<ClassId, Box<dyn Any + Send>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Fetch the suite for `T`, creating it on first use.
    pub fn require_suite<T: Fixture>(&mut self) -> &mut Suite<T> {
        let class = ClassId::of::<T>();
        let entry = self.suites.entry(class).or_insert_with(|| {
            debug!(%class, "creating suite");
            Box::new(Suite::<T>::new())
        });
        match entry.downcast_mut::<Suite<T>>() {
            Some(suite) => suite,
            None => unreachable!("suite for `{class}` stored with a foreign fixture type"),
        }
    }

    /// The suite for `T`, if anything was registered for it.
    pub fn suite<T: Fixture>(&self) -> Option<&Suite<T>> {
        self.suites
            .get(&ClassId::of::<T>())
            .and_then(|suite| suite.downcast_ref())
    }

    pub fn contains<T: Fixture>(&self) -> bool {
        self.suites.contains_key(&ClassId::of::<T>())
    }

    /// Number of classes with a suite.
    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Every class with a suite, in no particular order.
    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.suites.keys().copied()
    }

    pub fn add_test<T: Fixture, R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
        message: impl Into<String>,
        timeout: Option<Duration>,
    ) {
        self.require_suite::<T>()
            .add_test(method, callable, message, timeout);
    }

    pub fn add_test_only<T: Fixture, R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
        message: impl Into<String>,
        timeout: Option<Duration>,
    ) {
        self.require_suite::<T>()
            .add_test_only(method, callable, message, timeout);
    }

    pub fn add_before_each<T: Fixture, R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.require_suite::<T>().add_before_each(method, callable);
    }

    pub fn add_after_each<T: Fixture, R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.require_suite::<T>().add_after_each(method, callable);
    }

    pub fn add_before_all<T: Fixture, R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.require_suite::<T>().add_before_all(method, callable);
    }

    pub fn add_after_all<T: Fixture, R: IntoStepResult>(
        &mut self,
        method: &'static str,
        callable: impl Fn(&mut T) -> R + Send + Sync + 'static,
    ) {
        self.require_suite::<T>().add_after_all(method, callable);
    }

    pub fn inject_topo<T: Fixture>(
        &mut self,
        property: &'static str,
        kind: impl Into<TopoKind>,
        assign: impl Fn(&mut T, Resource) -> StepResult + Send + Sync + 'static,
    ) {
        self.require_suite::<T>()
            .inject_topo(property, kind, assign);
    }

    /// Issue the registrations a `#[suite]` type declares.
    pub fn declare<T: DeclaredSuite>(&mut self) {
        T::declare(self);
    }

    /// Title the suite for `T` (when `message` is given) and compile it.
    ///
    /// A suite that was already generated is left untouched.
    pub fn compile<T: Fixture>(
        &mut self,
        message: Option<&str>,
        topology: &SharedTopology,
    ) -> Result<CompiledSuite, SuiteError> {
        let suite = self.require_suite::<T>();
        if suite.is_generated() {
            return Err(SuiteError::AlreadyGenerated {
                class: suite.class(),
            });
        }
        if let Some(message) = message {
            suite.message(message);
        }
        suite.compile(topology)
    }

    /// Title the suite for `T` (when `message` is given) and register it with
    /// `runner`.
    ///
    /// A class with no registrations still yields a suite holding the two
    /// topology steps.
    pub fn generate<T: Fixture>(
        &mut self,
        message: Option<&str>,
        runner: &mut dyn Runner,
        topology: &SharedTopology,
    ) -> Result<(), SuiteError> {
        self.compile::<T>(message, topology)?.emit(runner);
        Ok(())
    }

    /// Declare and generate a `#[suite]` type in one go.
    pub fn compile_declared<T: DeclaredSuite>(
        &mut self,
        runner: &mut dyn Runner,
        topology: &SharedTopology,
    ) -> Result<(), SuiteError> {
        self.declare::<T>();
        self.generate::<T>(T::TITLE, runner, topology)
    }
}

static ENVIRONMENT: LazyLock<Mutex<Environment>> =
    LazyLock::new(|| Mutex::new(Environment::new()));

/// The process-wide environment.
pub fn environment() -> &'static Mutex<Environment> {
    &ENVIRONMENT
}

/// Declare a `#[suite]` type into the process-wide environment.
pub fn declare<T: DeclaredSuite>() {
    ENVIRONMENT.lock().declare::<T>();
}

/// Generate the suite for `T` from the process-wide environment.
///
/// The registry lock is released before `runner` is driven.
pub fn generate<T: Fixture>(
    message: Option<&str>,
    runner: &mut dyn Runner,
    topology: &SharedTopology,
) -> Result<(), SuiteError> {
    let compiled = ENVIRONMENT.lock().compile::<T>(message, topology)?;
    compiled.emit(runner);
    Ok(())
}

/// Declare and generate a `#[suite]` type through the process-wide environment.
pub fn generate_declared<T: DeclaredSuite>(
    runner: &mut dyn Runner,
    topology: &SharedTopology,
) -> Result<(), SuiteError> {
    declare::<T>();
    generate::<T>(T::TITLE, runner, topology)
}
