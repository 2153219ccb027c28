//! Steps handed to the runner and the errors they report.

use std::fmt;

use crate::class_id::ClassId;
use crate::topology::TopologyError;

/// One runnable unit registered with a runner: a hook body or a test body.
///
/// Steps own everything they touch (the suite context, the topology handle),
/// so a runner may hold them for as long as it likes.
pub type Step = Box<dyn FnMut() -> StepResult + Send>;

/// Result of running a single step.
pub type StepResult = Result<(), StepError>;

/// Failure reported by a step.
///
/// Errors from external collaborators pass through unchanged; the core never
/// recovers from them.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A hook or test body reported failure.
    #[error("{0}")]
    Failed(String),

    /// The topology provider failed to acquire or release.
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// An acquired resource could not be converted to the injected type.
    #[error("topology resource is not a `{expected}`")]
    ResourceType { expected: &'static str },

    /// A hook or test ran while no fixture instance existed for its suite.
    #[error("no live `{class}` instance; the suite's topology step has not run")]
    ContextUnavailable { class: ClassId },

    /// Another step, typically one abandoned after a timeout, still holds
    /// the suite's fixture instance.
    #[error("`{class}` instance is still held by an earlier step")]
    ContextBusy { class: ClassId },
}

impl StepError {
    /// Build a failure from any displayable message.
    #[cold]
    pub fn failed(msg: impl fmt::Display) -> Self {
        StepError::Failed(msg.to_string())
    }
}

/// Return types accepted from hook and test methods.
pub trait IntoStepResult: 'static {
    fn into_step_result(self) -> StepResult;
}

impl IntoStepResult for () {
    #[inline]
    fn into_step_result(self) -> StepResult {
        Ok(())
    }
}

impl<E: fmt::Display + 'static> IntoStepResult for Result<(), E> {
    fn into_step_result(self) -> StepResult {
        self.map_err(StepError::failed)
    }
}
