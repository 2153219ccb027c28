//! Test execution engine.
//!
//! Runs a [`SuitePlan`] tree and collects results.
//!
//! Scopes run depth first: a scope's before-all hooks, its own tests, its
//! child scopes, then its after-all hooks in reverse registration order. Each
//! test is wrapped by the before-each hooks of every enclosing scope
//! (outermost first) and the after-each hooks in the opposite order.
//!
//! Every step runs on its own thread so that a hung step can be abandoned
//! when its timeout expires; the step's lock stays held by the abandoned
//! thread, and any later attempt to run it fails as busy.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rig_suite::{HookKind, StepError, TestMode};
use tracing::{debug, debug_span, info, warn};

use crate::config::RunnerConfig;
use crate::plan::{
    join_title, PlannedHook, PlannedTest, SharedStep, SuitePlan, TITLE_SEPARATOR,
};
use crate::result::{RunSummary, SuiteSummary, TestResult};

/// Why a step did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    /// The step returned an error.
    #[error(transparent)]
    Error(#[from] StepError),

    #[error("panicked: {0}")]
    Panic(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// An earlier run of the same step timed out and has not returned.
    #[error("still running after an earlier timeout")]
    Busy,
}

/// Which tests a run executes.
struct Selection<'a> {
    /// An exclusive test exists somewhere in the plan.
    exclusive_only: bool,
    filter: Option<&'a str>,
}

impl<'a> Selection<'a> {
    fn new(plan: &SuitePlan, filter: Option<&'a str>) -> Self {
        Selection {
            exclusive_only: plan.has_exclusive(),
            filter,
        }
    }

    /// Why the test titled `full_title` is not selected, if it isn't.
    fn skip_reason(&self, full_title: &str, mode: TestMode) -> Option<&'static str> {
        if self.exclusive_only && !mode.is_exclusive() {
            return Some("exclusive tests present");
        }
        match self.filter {
            Some(filter) if !full_title.contains(filter) => Some("filtered out"),
            _ => None,
        }
    }

    /// Number of selected tests in `plan` and its children.
    fn selected_in(&self, plan: &SuitePlan, path: &[&str]) -> usize {
        let own = plan
            .tests
            .iter()
            .filter(|t| self.skip_reason(&join_title(path, &t.title), t.mode).is_none())
            .count();
        let nested: usize = plan
            .children
            .iter()
            .map(|child| {
                let mut child_path = path.to_vec();
                child_path.extend(child.title.as_deref());
                self.selected_in(child, &child_path)
            })
            .sum();
        own + nested
    }
}

/// Execution state inherited from enclosing scopes.
#[derive(Clone, Default)]
struct Scope<'p> {
    path: Vec<&'p str>,
    /// Outermost first.
    before_each: Vec<&'p PlannedHook>,
    /// Innermost first, each scope's hooks reversed.
    after_each: Vec<&'p PlannedHook>,
    /// Set once a before-all hook here or above has failed.
    blocked: Option<String>,
}

impl<'p> Scope<'p> {
    fn enter(&self, plan: &'p SuitePlan) -> Self {
        let mut path = self.path.clone();
        path.extend(plan.title.as_deref());

        let mut before_each = self.before_each.clone();
        before_each.extend(plan.hooks_of(HookKind::BeforeEach));

        let mut after_each: Vec<_> = plan.hooks_of(HookKind::AfterEach).rev().collect();
        after_each.extend(self.after_each.iter().copied());

        Scope {
            path,
            before_each,
            after_each,
            blocked: self.blocked.clone(),
        }
    }

    fn title(&self) -> String {
        if self.path.is_empty() {
            "(top level)".to_owned()
        } else {
            self.path.join(TITLE_SEPARATOR)
        }
    }
}

/// Test runner.
#[derive(Default)]
pub struct TestRunner {
    config: RunnerConfig,
}

impl TestRunner {
    /// Create a new test runner with default config.
    pub fn new() -> Self {
        TestRunner::default()
    }

    /// Create a test runner with custom config.
    pub fn with_config(config: RunnerConfig) -> Self {
        TestRunner { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every selected test in `plan`.
    pub fn run(&self, plan: &SuitePlan) -> RunSummary {
        let start = Instant::now();
        let selection = Selection::new(plan, self.config.filter.as_deref());
        info!(
            tests = plan.test_count(),
            exclusive = selection.exclusive_only,
            filter = self.config.filter.as_deref(),
            parallel = self.config.parallel,
            "starting run"
        );

        let suites = self.run_suite(plan, &Scope::default(), &selection, self.config.parallel);

        let mut summary = RunSummary::new();
        for suite in suites {
            summary.add_suite(suite);
        }
        summary.duration = start.elapsed();
        info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        summary
    }

    /// Run one scope and everything nested in it.
    fn run_suite<'p>(
        &self,
        plan: &'p SuitePlan,
        parent: &Scope<'p>,
        selection: &Selection<'_>,
        parallel_children: bool,
    ) -> Vec<SuiteSummary> {
        let mut scope = parent.enter(plan);
        let title = scope.title();
        let _span = debug_span!("suite", %title).entered();
        let started = Instant::now();
        let mut summary = SuiteSummary::new(title.as_str());

        // Nothing selected below this point: no hooks, not even topology.
        let active = selection.selected_in(plan, &scope.path) > 0;
        let run_hooks = active && scope.blocked.is_none();

        if run_hooks {
            for hook in plan.hooks_of(HookKind::BeforeAll) {
                if let Err(failure) = self.run_step(&hook.step, hook.timeout) {
                    warn!(suite = %title, %failure, "before all hook failed");
                    scope.blocked = Some(format!("\"before all\" hook failed: {failure}"));
                    break;
                }
            }
        }

        for test in &plan.tests {
            let full_title = join_title(&scope.path, &test.title);
            let result = if let Some(reason) = selection.skip_reason(&full_title, test.mode) {
                TestResult::skipped(test.title.as_str(), reason)
            } else if let Some(blocked) = &scope.blocked {
                TestResult::failed(test.title.as_str(), blocked.as_str(), Duration::ZERO)
            } else {
                self.run_test(test, &scope)
            };
            summary.add_result(result);
        }
        let own = started.elapsed();

        let children = self.run_children(plan, &scope, selection, parallel_children);

        let teardown = Instant::now();
        if run_hooks {
            for hook in plan.hooks_of(HookKind::AfterAll).rev() {
                if let Err(failure) = self.run_step(&hook.step, hook.timeout) {
                    warn!(suite = %title, %failure, "after all hook failed");
                    summary.add_error(format!("\"after all\" hook failed: {failure}"));
                }
            }
        }
        summary.duration = own + teardown.elapsed();

        let mut suites = Vec::with_capacity(1 + children.len());
        suites.push(summary);
        suites.extend(children);
        suites
    }

    fn run_children<'p>(
        &self,
        plan: &'p SuitePlan,
        scope: &Scope<'p>,
        selection: &Selection<'_>,
        parallel: bool,
    ) -> Vec<SuiteSummary> {
        if parallel && plan.children.len() > 1 {
            // build_scoped tears the pool down before returning, avoiding the
            // global pool's atexit hang.
            let result = rayon::ThreadPoolBuilder::new().build_scoped(
                rayon::ThreadBuilder::run,
                |pool| {
                    pool.install(|| {
                        plan.children
                            .par_iter()
                            .map(|child| self.run_suite(child, scope, selection, false))
                            .collect::<Vec<_>>()
                    })
                },
            );
            match result {
                Ok(groups) => return groups.into_iter().flatten().collect(),
                Err(e) => warn!("failed to create thread pool ({e}), running sequentially"),
            }
        }

        plan.children
            .iter()
            .flat_map(|child| self.run_suite(child, scope, selection, false))
            .collect()
    }

    /// Run one test between its each-hooks.
    fn run_test(&self, test: &PlannedTest, scope: &Scope<'_>) -> TestResult {
        let start = Instant::now();
        let mut failure: Option<String> = None;

        for hook in &scope.before_each {
            if let Err(e) = self.run_step(&hook.step, hook.timeout) {
                failure = Some(format!("\"before each\" hook failed: {e}"));
                break;
            }
        }
        if failure.is_none() {
            if let Err(e) = self.run_step(&test.step, test.timeout) {
                failure = Some(e.to_string());
            }
        }
        // After-each hooks run even when the test or a before-each failed.
        for hook in &scope.after_each {
            if let Err(e) = self.run_step(&hook.step, hook.timeout) {
                warn!(test = %test.title, failure = %e, "after each hook failed");
                if failure.is_none() {
                    failure = Some(format!("\"after each\" hook failed: {e}"));
                }
            }
        }

        let duration = start.elapsed();
        match failure {
            None => {
                debug!(test = %test.title, ?duration, "passed");
                TestResult::passed(test.title.as_str(), duration)
            }
            Some(error) => {
                debug!(test = %test.title, %error, "failed");
                TestResult::failed(test.title.as_str(), error, duration)
            }
        }
    }

    /// Run `step` on a worker thread, waiting at most its timeout.
    fn run_step(&self, step: &SharedStep, timeout: Option<Duration>) -> Result<(), StepFailure> {
        let limit = timeout.unwrap_or(self.config.default_timeout);
        let (tx, rx) = mpsc::channel();
        let task = Arc::clone(step);
        let spawned = thread::Builder::new()
            .name("rig-step".to_owned())
            .spawn(move || {
                // The receiver is gone if the step already timed out.
                let _ = tx.send(invoke(&task));
            });
        if let Err(e) = spawned {
            warn!("failed to spawn step thread ({e}), running inline");
            return invoke(step);
        }

        let lost = || StepFailure::Panic("step thread exited without a result".to_owned());
        if limit.is_zero() {
            return rx.recv().unwrap_or_else(|_| Err(lost()));
        }
        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(StepFailure::Timeout(limit)),
            Err(RecvTimeoutError::Disconnected) => Err(lost()),
        }
    }
}

fn invoke(step: &SharedStep) -> Result<(), StepFailure> {
    let Some(mut step) = step.try_lock() else {
        return Err(StepFailure::Busy);
    };
    match catch_unwind(AssertUnwindSafe(|| (*step)())) {
        Ok(result) => result.map_err(StepFailure::from),
        Err(payload) => Err(StepFailure::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
