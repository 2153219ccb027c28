//! Runner configuration and command-line flags.

use std::time::Duration;

/// Timeout applied to steps registered without one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for the test runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Only run tests whose full title contains this substring.
    pub filter: Option<String>,
    /// Report passing and skipped tests as well as failures.
    pub verbose: bool,
    /// Run top-level suites in parallel.
    ///
    /// Off by default: suites usually share one topology provider, whose
    /// `terminate` releases everything the process holds.
    pub parallel: bool,
    /// Timeout for steps registered without one. Zero disables it.
    pub default_timeout: Duration,
    /// Print test titles instead of running them.
    pub list: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            filter: None,
            verbose: false,
            parallel: false,
            default_timeout: DEFAULT_TIMEOUT,
            list: false,
        }
    }
}

/// Bad command-line input.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown flag `{0}`")]
    UnknownFlag(String),

    #[error("invalid timeout `{0}`: expected milliseconds")]
    InvalidTimeout(String),
}

impl RunnerConfig {
    /// Parse flags, not including the program name.
    ///
    /// Accepts `--filter=<pattern>`, `-v`/`--verbose`, `--parallel`,
    /// `--no-parallel`, `--timeout=<millis>` and `--list`. Flags cargo passes
    /// to every test binary (`--nocapture`, `--test-threads=...` and the like)
    /// are ignored. The first bare argument is taken as a filter, the way
    /// `cargo test <pattern>` forwards one.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = RunnerConfig::default();
        for arg in args {
            let arg = arg.as_ref();
            if let Some(filter) = arg.strip_prefix("--filter=") {
                config.filter = Some(filter.to_string());
            } else if let Some(millis) = arg.strip_prefix("--timeout=") {
                let millis = millis
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout(millis.to_string()))?;
                config.default_timeout = Duration::from_millis(millis);
            } else if arg == "--verbose" || arg == "-v" {
                config.verbose = true;
            } else if arg == "--parallel" {
                config.parallel = true;
            } else if arg == "--no-parallel" {
                config.parallel = false;
            } else if arg == "--list" {
                config.list = true;
            } else if is_cargo_flag(arg) {
                // libtest flags cargo forwards to every test target
            } else if arg.starts_with('-') {
                return Err(ConfigError::UnknownFlag(arg.to_string()));
            } else if config.filter.is_none() {
                config.filter = Some(arg.to_string());
            }
        }
        Ok(config)
    }

    /// Parse the process arguments.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(std::env::args().skip(1))
    }
}

fn is_cargo_flag(arg: &str) -> bool {
    matches!(
        arg,
        "--nocapture" | "--show-output" | "--quiet" | "-q" | "--exact" | "--ignored"
    ) || arg.starts_with("--test-threads")
        || arg.starts_with("--color")
        || arg.starts_with("--format")
}

/// Usage text for `--help`-style output.
pub fn usage() -> &'static str {
    "Options:
  --filter=<pattern>  Only run tests whose title contains pattern
  --verbose, -v       Show passing and skipped tests
  --parallel          Run top-level suites in parallel
  --no-parallel       Run suites sequentially (default)
  --timeout=<ms>      Default step timeout (0 disables)
  --list              Print test titles without running them"
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = RunnerConfig::from_args(Vec::<String>::new()).unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert!(!config.parallel);
        assert_eq!(config.default_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn all_flags() {
        let config =
            RunnerConfig::from_args(["--filter=link", "-v", "--parallel", "--timeout=250", "--list"])
                .unwrap();
        assert_eq!(
            config,
            RunnerConfig {
                filter: Some("link".into()),
                verbose: true,
                parallel: true,
                default_timeout: Duration::from_millis(250),
                list: true,
            }
        );
    }

    #[test]
    fn positional_filter_and_cargo_flags() {
        let config = RunnerConfig::from_args(["--nocapture", "port", "--test-threads=1"]).unwrap();
        assert_eq!(config.filter.as_deref(), Some("port"));
    }

    #[test]
    fn explicit_filter_wins_over_positional() {
        let config = RunnerConfig::from_args(["--filter=link", "port"]).unwrap();
        assert_eq!(config.filter.as_deref(), Some("link"));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            RunnerConfig::from_args(["--bogus"]).unwrap_err(),
            ConfigError::UnknownFlag("--bogus".into())
        );
        assert_eq!(
            RunnerConfig::from_args(["--timeout=soon"]).unwrap_err(),
            ConfigError::InvalidTimeout("soon".into())
        );
    }
}
