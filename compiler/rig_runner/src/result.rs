//! Test result types.

use std::time::Duration;

/// Outcome of a single test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    /// Test passed successfully.
    Passed,
    /// Test, or one of the hooks around it, failed with an error message.
    Failed(String),
    /// Test was not selected to run, with the reason.
    Skipped(String),
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TestOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestOutcome::Skipped(_))
    }
}

/// Result of running a single test.
#[derive(Clone, Debug)]
pub struct TestResult {
    /// Title the test was registered under.
    pub title: String,
    /// Outcome of the test.
    pub outcome: TestOutcome,
    /// Time taken by the test and its each-hooks.
    pub duration: Duration,
}

impl TestResult {
    /// Create a passed test result.
    pub fn passed(title: impl Into<String>, duration: Duration) -> Self {
        TestResult {
            title: title.into(),
            outcome: TestOutcome::Passed,
            duration,
        }
    }

    /// Create a failed test result.
    #[cold]
    pub fn failed(title: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        TestResult {
            title: title.into(),
            outcome: TestOutcome::Failed(error.into()),
            duration,
        }
    }

    /// Create a skipped test result.
    #[cold]
    pub fn skipped(title: impl Into<String>, reason: impl Into<String>) -> Self {
        TestResult {
            title: title.into(),
            outcome: TestOutcome::Skipped(reason.into()),
            duration: Duration::ZERO,
        }
    }
}

/// Summary of test results for a single suite scope.
#[derive(Clone, Debug, Default)]
pub struct SuiteSummary {
    /// Titles of the enclosing scopes and this one, joined with ` > `.
    pub title: String,
    /// Results of the tests registered directly in this scope.
    pub results: Vec<TestResult>,
    /// Number of tests that passed.
    pub passed: usize,
    /// Number of tests that failed.
    pub failed: usize,
    /// Number of tests that were skipped.
    pub skipped: usize,
    /// Total time spent in this scope, hooks included, children excluded.
    pub duration: Duration,
    /// Failures outside any test (after-all hooks).
    pub errors: Vec<String>,
}

impl SuiteSummary {
    pub fn new(title: impl Into<String>) -> Self {
        SuiteSummary {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn add_result(&mut self, result: TestResult) {
        match &result.outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed(_) => self.failed += 1,
            TestOutcome::Skipped(_) => self.skipped += 1,
        }
        self.results.push(result);
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || !self.errors.is_empty()
    }

    /// The result for `title`, if this scope registered such a test.
    pub fn result(&self, title: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.title == title)
    }
}

/// Overall summary of a run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Results for each scope, in execution order.
    pub suites: Vec<SuiteSummary>,
    /// Total tests passed.
    pub passed: usize,
    /// Total tests failed.
    pub failed: usize,
    /// Total tests skipped.
    pub skipped: usize,
    /// Number of scopes with after-all failures.
    pub error_suites: usize,
    /// Wall-clock time for the run.
    pub duration: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        RunSummary::default()
    }

    pub fn add_suite(&mut self, summary: SuiteSummary) {
        self.passed += summary.passed;
        self.failed += summary.failed;
        self.skipped += summary.skipped;
        if !summary.errors.is_empty() {
            self.error_suites += 1;
        }
        self.suites.push(summary);
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Tests that actually ran.
    pub fn executed(&self) -> usize {
        self.passed + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.error_suites > 0
    }

    /// The summary for the scope titled `title` (full ` > ` path).
    pub fn suite(&self, title: &str) -> Option<&SuiteSummary> {
        self.suites.iter().find(|s| s.title == title)
    }

    /// Get exit code: 0 = all pass, 1 = failures (tests or hooks), 2 = no tests ran.
    pub fn exit_code(&self) -> i32 {
        if self.executed() == 0 && self.error_suites == 0 {
            2
        } else {
            i32::from(self.has_failures())
        }
    }
}
