//! Registration capture.
//!
//! [`PlanRunner`] implements the suite compiler's `Runner` seam by recording
//! every `describe`, hook and test into a tree of [`SuitePlan`]s. Nothing runs
//! at registration time; the tree is handed to [`TestRunner`] afterwards.
//!
//! [`TestRunner`]: crate::TestRunner

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rig_suite::{HookKind, Runner, Step, TestMode};
use tracing::trace;

/// Separator between scope titles in a full test title.
pub const TITLE_SEPARATOR: &str = " > ";

/// A step that may be run several times and from worker threads.
pub type SharedStep = Arc<Mutex<Step>>;

/// A recorded lifecycle hook.
pub struct PlannedHook {
    pub kind: HookKind,
    pub timeout: Option<Duration>,
    pub step: SharedStep,
}

/// A recorded test.
pub struct PlannedTest {
    pub title: String,
    pub mode: TestMode,
    pub timeout: Option<Duration>,
    pub step: SharedStep,
}

/// One `describe` scope, or the root of the registration tree.
#[derive(Default)]
pub struct SuitePlan {
    pub title: Option<String>,
    /// Hooks of every kind, in registration order.
    pub hooks: Vec<PlannedHook>,
    pub tests: Vec<PlannedTest>,
    pub children: Vec<SuitePlan>,
}

impl SuitePlan {
    pub fn new(title: Option<&str>) -> Self {
        SuitePlan {
            title: title.map(str::to_owned),
            ..SuitePlan::default()
        }
    }

    /// Hooks of one kind, in registration order.
    pub fn hooks_of(&self, kind: HookKind) -> impl DoubleEndedIterator<Item = &PlannedHook> {
        self.hooks.iter().filter(move |h| h.kind == kind)
    }

    /// Tests in this scope and every nested one.
    pub fn test_count(&self) -> usize {
        self.tests.len() + self.children.iter().map(SuitePlan::test_count).sum::<usize>()
    }

    /// Whether any test in the tree is exclusive.
    pub fn has_exclusive(&self) -> bool {
        self.tests.iter().any(|t| t.mode.is_exclusive())
            || self.children.iter().any(SuitePlan::has_exclusive)
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty() && self.tests.is_empty() && self.children.is_empty()
    }

    /// Full titles of every test in the tree, in execution order.
    pub fn test_titles(&self) -> Vec<String> {
        let mut titles = Vec::with_capacity(self.test_count());
        self.collect_titles(&mut Vec::new(), &mut titles);
        titles
    }

    fn collect_titles<'p>(&'p self, path: &mut Vec<&'p str>, out: &mut Vec<String>) {
        let pushed = if let Some(title) = self.title.as_deref() {
            path.push(title);
            true
        } else {
            false
        };
        out.extend(self.tests.iter().map(|t| join_title(path, &t.title)));
        for child in &self.children {
            child.collect_titles(path, out);
        }
        if pushed {
            path.pop();
        }
    }
}

/// `path` and `title` joined with [`TITLE_SEPARATOR`].
pub(crate) fn join_title(path: &[&str], title: &str) -> String {
    if path.is_empty() {
        title.to_owned()
    } else {
        format!("{}{TITLE_SEPARATOR}{title}", path.join(TITLE_SEPARATOR))
    }
}

/// A [`Runner`] that builds a [`SuitePlan`] tree.
#[derive(Default)]
pub struct PlanRunner {
    plan: SuitePlan,
}

impl PlanRunner {
    pub fn new() -> Self {
        PlanRunner::default()
    }

    pub fn plan(&self) -> &SuitePlan {
        &self.plan
    }

    pub fn into_plan(self) -> SuitePlan {
        self.plan
    }
}

impl Runner for PlanRunner {
    fn describe(&mut self, title: Option<&str>, body: &mut dyn FnMut(&mut dyn Runner)) {
        trace!(title = title.unwrap_or("<untitled>"), "describe");
        let mut child = PlanRunner {
            plan: SuitePlan::new(title),
        };
        body(&mut child);
        self.plan.children.push(child.plan);
    }

    fn hook(&mut self, kind: HookKind, step: Step, timeout: Option<Duration>) {
        self.plan.hooks.push(PlannedHook {
            kind,
            timeout,
            step: Arc::new(Mutex::new(step)),
        });
    }

    fn test(&mut self, title: &str, mode: TestMode, step: Step, timeout: Option<Duration>) {
        self.plan.tests.push(PlannedTest {
            title: title.to_owned(),
            mode,
            timeout,
            step: Arc::new(Mutex::new(step)),
        });
    }
}
