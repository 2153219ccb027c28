//! Rig Runner - reference runner for rig test suites.
//!
//! Implements the suite compiler's `Runner` seam in two phases:
//!
//! ```text
//! generate() ──► PlanRunner ──► SuitePlan tree
//!                                   │
//!                                   ▼
//!                   TestRunner::run ──► RunSummary ──► report
//! ```
//!
//! Selection follows the usual exclusive-test rules: if any test anywhere is
//! exclusive, only exclusive tests run. A title filter narrows selection
//! further, and scopes with nothing selected run no hooks at all.
//!
//! # Test targets
//!
//! A `harness = false` test target hands its suites to [`run_main`]:
//!
//! ```ignore
//! fn main() {
//!     let topology: SharedTopology = Arc::new(lab_topology());
//!     rig_runner::run_main(topology, |runner, topology| {
//!         rig_suite::generate_declared::<LinkSuite>(runner, topology)?;
//!         rig_suite::generate_declared::<PortSuite>(runner, topology)
//!     });
//! }
//! ```

mod config;
mod plan;
mod report;
mod result;
mod runner;
mod topology;

use std::sync::Once;

use rig_suite::{SharedTopology, SuiteError};

pub use config::{usage, ConfigError, RunnerConfig, DEFAULT_TIMEOUT};
pub use plan::{PlanRunner, PlannedHook, PlannedTest, SharedStep, SuitePlan, TITLE_SEPARATOR};
pub use report::{print_summary, Report};
pub use result::{RunSummary, SuiteSummary, TestOutcome, TestResult};
pub use runner::{StepFailure, TestRunner};
pub use topology::StaticTopology;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging runs.
///
/// Does nothing unless `RUST_LOG` is set. `RIG_LOG_TREE` switches to an
/// indented tree of suite spans.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        let installed = if std::env::var_os("RIG_LOG_TREE").is_some() {
            tracing_subscriber::registry()
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .with(filter)
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init()
        };
        if let Err(e) = installed {
            eprintln!("warning: tracing not initialized: {e}");
        }
    });
}

/// Register suites through `declare` and run them.
///
/// Suites are declared into a fresh [`PlanRunner`], so a declaration error
/// aborts before anything runs.
pub fn run_declared<F>(
    config: RunnerConfig,
    topology: &SharedTopology,
    declare: F,
) -> Result<RunSummary, SuiteError>
where
    F: FnOnce(&mut PlanRunner, &SharedTopology) -> Result<(), SuiteError>,
{
    let mut planner = PlanRunner::new();
    declare(&mut planner, topology)?;
    let plan = planner.into_plan();
    Ok(TestRunner::with_config(config).run(&plan))
}

/// Entry point for `harness = false` test targets.
///
/// Parses the process arguments, runs the declared suites, prints the report
/// and exits with the summary's exit code (2 on bad arguments).
pub fn run_main<F>(topology: SharedTopology, declare: F) -> !
where
    F: FnOnce(&mut PlanRunner, &SharedTopology) -> Result<(), SuiteError>,
{
    init_tracing();

    if std::env::args().skip(1).any(|a| a == "--help" || a == "-h") {
        println!("{}", usage());
        std::process::exit(0);
    }
    let config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}\n\n{}", usage());
            std::process::exit(2);
        }
    };

    if config.list {
        let mut planner = PlanRunner::new();
        if let Err(e) = declare(&mut planner, &topology) {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
        for title in planner.plan().test_titles() {
            println!("{title}: test");
        }
        std::process::exit(0);
    }

    let verbose = config.verbose;
    match run_declared(config, &topology, declare) {
        Ok(summary) => {
            print_summary(&summary, verbose);
            std::process::exit(summary.exit_code());
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
