//! Runner seam.
//!
//! The core never runs anything itself. It registers groups, hooks and tests
//! through this trait in a fixed order and leaves scheduling, timeouts and
//! reporting to the implementation.

use std::fmt;
use std::time::Duration;

use crate::step::Step;

/// Lifecycle hook kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    /// All kinds, in emission order.
    pub const ALL: [HookKind; 4] = [
        HookKind::BeforeAll,
        HookKind::AfterAll,
        HookKind::BeforeEach,
        HookKind::AfterEach,
    ];

    /// Index into per-kind tables.
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            HookKind::BeforeAll => 0,
            HookKind::AfterAll => 1,
            HookKind::BeforeEach => 2,
            HookKind::AfterEach => 3,
        }
    }

    /// Whether the hook wraps the whole suite rather than each test.
    pub fn is_suite_scoped(self) -> bool {
        matches!(self, HookKind::BeforeAll | HookKind::AfterAll)
    }

    /// Whether the hook runs after its scope.
    pub fn is_after(self) -> bool {
        matches!(self, HookKind::AfterAll | HookKind::AfterEach)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::BeforeAll => "before all",
            HookKind::AfterAll => "after all",
            HookKind::BeforeEach => "before each",
            HookKind::AfterEach => "after each",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a test takes part in selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TestMode {
    /// Runs unless exclusive tests exist.
    #[default]
    Normal,
    /// Runs to the exclusion of every `Normal` test the runner knows about,
    /// in every suite, not only the one that declared it.
    Exclusive,
}

impl TestMode {
    pub fn is_exclusive(self) -> bool {
        matches!(self, TestMode::Exclusive)
    }
}

/// The external test runner's registration primitives.
///
/// Implementations must honour two contracts the core relies on:
///
/// - after-hooks of one scope execute in reverse registration order, so the
///   topology teardown registered first runs after every user after-all hook;
/// - `TestMode::Exclusive` suppresses normal tests process-wide.
///
/// A `None` timeout means "use the runner's default".
pub trait Runner {
    /// Open a grouping scope. Registrations made on the runner passed to
    /// `body` belong to that scope.
    fn describe(&mut self, title: Option<&str>, body: &mut dyn FnMut(&mut dyn Runner));

    /// Register a lifecycle hook in the current scope.
    fn hook(&mut self, kind: HookKind, step: Step, timeout: Option<Duration>);

    /// Register a test in the current scope.
    fn test(&mut self, title: &str, mode: TestMode, step: Step, timeout: Option<Duration>);
}
