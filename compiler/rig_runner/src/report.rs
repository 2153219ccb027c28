//! Console report for a finished run.

use std::fmt;

use crate::result::{RunSummary, TestOutcome};

/// Display adapter rendering a [`RunSummary`].
///
/// Failures and suite errors are always listed; passes and skips only when
/// `verbose` is set.
pub struct Report<'a> {
    summary: &'a RunSummary,
    verbose: bool,
}

impl<'a> Report<'a> {
    pub fn new(summary: &'a RunSummary, verbose: bool) -> Self {
        Report { summary, verbose }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        for suite in &summary.suites {
            if suite.total() == 0 && suite.errors.is_empty() {
                continue;
            }
            if !self.verbose && !suite.has_failures() {
                continue;
            }

            writeln!(f, "\n{}", suite.title)?;
            for result in &suite.results {
                match &result.outcome {
                    TestOutcome::Passed if self.verbose => {
                        writeln!(f, "  PASS: {} ({:.2?})", result.title, result.duration)?;
                    }
                    TestOutcome::Failed(msg) => writeln!(f, "  FAIL: {} - {}", result.title, msg)?,
                    TestOutcome::Skipped(reason) if self.verbose => {
                        writeln!(f, "  SKIP: {} - {}", result.title, reason)?;
                    }
                    _ => {}
                }
            }
            for error in &suite.errors {
                writeln!(f, "  ERROR: {error}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Test Summary:")?;
        writeln!(
            f,
            "  {} passed, {} failed, {} skipped ({} total)",
            summary.passed,
            summary.failed,
            summary.skipped,
            summary.total()
        )?;
        if summary.error_suites > 0 {
            writeln!(f, "  {} suite(s) with hook errors", summary.error_suites)?;
        }
        writeln!(f, "  Completed in {:.2?}", summary.duration)?;
        writeln!(f)?;

        if summary.has_failures() {
            writeln!(f, "FAILED")
        } else if summary.executed() == 0 {
            writeln!(f, "NO TESTS RAN")
        } else {
            writeln!(f, "OK")
        }
    }
}

/// Print a summary of test results, with optional verbose output.
pub fn print_summary(summary: &RunSummary, verbose: bool) {
    print!("{}", Report::new(summary, verbose));
}
