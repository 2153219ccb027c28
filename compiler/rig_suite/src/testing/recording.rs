//! Recording runner.

use std::time::Duration;

use crate::runner::{HookKind, Runner, TestMode};
use crate::step::{Step, StepResult};

/// A registration as seen by the runner, without its step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    Hook(HookKind, Option<Duration>),
    Test(String, TestMode, Option<Duration>),
}

/// A recorded lifecycle hook.
pub struct RecordedHook {
    pub kind: HookKind,
    pub timeout: Option<Duration>,
    step: Step,
}

impl RecordedHook {
    /// Run the recorded step.
    pub fn run(&mut self) -> StepResult {
        (self.step)()
    }
}

/// A recorded test.
pub struct RecordedTest {
    pub title: String,
    pub mode: TestMode,
    pub timeout: Option<Duration>,
    step: Step,
}

impl RecordedTest {
    /// Run the recorded step.
    pub fn run(&mut self) -> StepResult {
        (self.step)()
    }
}

/// Everything registered inside one `describe` (or at the top level).
#[derive(Default)]
pub struct RecordedScope {
    pub title: Option<String>,
    pub hooks: Vec<RecordedHook>,
    pub tests: Vec<RecordedTest>,
    pub scopes: Vec<RecordedScope>,
    /// Hooks and tests interleaved in registration order.
    pub log: Vec<Registration>,
}

impl RecordedScope {
    /// Hooks of one kind, in registration order.
    pub fn hooks_of(&mut self, kind: HookKind) -> impl Iterator<Item = &mut RecordedHook> {
        self.hooks.iter_mut().filter(move |h| h.kind == kind)
    }

    /// The first hook of `kind`, if any.
    pub fn first_hook(&mut self, kind: HookKind) -> Option<&mut RecordedHook> {
        self.hooks_of(kind).next()
    }

    /// Run every hook of `kind` in registration order, stopping at the first error.
    pub fn run_hooks(&mut self, kind: HookKind) -> StepResult {
        for hook in self.hooks_of(kind) {
            hook.run()?;
        }
        Ok(())
    }

    /// The test registered under `title`, if any.
    pub fn test(&mut self, title: &str) -> Option<&mut RecordedTest> {
        self.tests.iter_mut().find(|t| t.title == title)
    }
}

/// A [`Runner`] that records registrations instead of running them.
#[derive(Default)]
pub struct RecordingRunner {
    root: RecordedScope,
    describes: usize,
}

impl RecordingRunner {
    pub fn new() -> Self {
        RecordingRunner::default()
    }

    /// Top-level registrations (outside any `describe`).
    pub fn root(&mut self) -> &mut RecordedScope {
        &mut self.root
    }

    /// The `index`-th top-level `describe` scope.
    ///
    /// # Panics
    ///
    /// Panics if fewer scopes were recorded.
    pub fn scope(&mut self, index: usize) -> &mut RecordedScope {
        &mut self.root.scopes[index]
    }

    /// Number of `describe` calls made at any depth.
    pub fn describe_count(&self) -> usize {
        self.describes
    }

    pub fn into_scopes(self) -> Vec<RecordedScope> {
        self.root.scopes
    }
}

impl Runner for RecordingRunner {
    fn describe(&mut self, title: Option<&str>, body: &mut dyn FnMut(&mut dyn Runner)) {
        let mut child = RecordingRunner::new();
        body(&mut child);
        self.describes += 1 + child.describes;
        let mut scope = child.root;
        scope.title = title.map(str::to_owned);
        self.root.scopes.push(scope);
    }

    fn hook(&mut self, kind: HookKind, step: Step, timeout: Option<Duration>) {
        self.root.log.push(Registration::Hook(kind, timeout));
        self.root.hooks.push(RecordedHook {
            kind,
            timeout,
            step,
        });
    }

    fn test(&mut self, title: &str, mode: TestMode, step: Step, timeout: Option<Duration>) {
        self.root
            .log
            .push(Registration::Test(title.to_owned(), mode, timeout));
        self.root.tests.push(RecordedTest {
            title: title.to_owned(),
            mode,
            timeout,
            step,
        });
    }
}
