//! Testing utilities for suites and runners.
//!
//! - **recording**: a [`Runner`](crate::Runner) that records every
//!   registration instead of running it, keeping the steps for later use
//! - **mock_topology**: a scripted [`Topology`](crate::Topology) that counts
//!   acquisitions and terminations
//!
//! # Usage
//!
//! ```ignore
//! use rig_suite::testing::{MockTopology, RecordingRunner};
//!
//! let mut runner = RecordingRunner::new();
//! env.generate::<LinkSuite>(Some("Link Tests"), &mut runner, &topology)?;
//! let scope = runner.scope(0);
//! assert_eq!(scope.title.as_deref(), Some("Link Tests"));
//! ```

pub mod mock_topology;
pub mod recording;

pub use mock_topology::MockTopology;
pub use recording::{RecordedHook, RecordedScope, RecordedTest, Registration, RecordingRunner};
