//! Per-run fixture context.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::class_id::{ClassId, Fixture};
use crate::step::StepError;

type Shared<T> = Arc<Mutex<T>>;

/// The single fixture instance shared by every step of one emitted suite.
///
/// Empty until the suite's topology step starts it; emptied again by the
/// teardown step. The outer lock is only held to swap or clone the instance
/// handle, never while a step runs, so a step abandoned after a timeout can
/// only keep the instance itself busy.
pub(crate) struct SuiteContext<T> {
    class: ClassId,
    slot: Shared<Option<Shared<T>>>,
}

impl<T: Fixture> SuiteContext<T> {
    pub(crate) fn new() -> Self {
        SuiteContext {
            class: ClassId::of::<T>(),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Build a fresh instance, replacing one left over from an earlier run.
    pub(crate) fn start(&self) {
        trace!(class = %self.class, "starting fixture");
        *self.slot.lock() = Some(Arc::new(Mutex::new(T::default())));
    }

    /// Run `f` against the live instance.
    ///
    /// Fails without waiting if another step still holds the instance.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StepError> {
        let instance = self
            .slot
            .lock()
            .clone()
            .ok_or(StepError::ContextUnavailable { class: self.class })?;
        let Some(mut fixture) = instance.try_lock() else {
            return Err(StepError::ContextBusy { class: self.class });
        };
        Ok(f(&mut *fixture))
    }

    /// Drop the instance.
    ///
    /// A step still holding it keeps it alive until that step returns.
    pub(crate) fn finish(&self) {
        trace!(class = %self.class, "dropping fixture");
        self.slot.lock().take();
    }

    #[cfg(test)]
    pub(crate) fn is_live(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T> Clone for SuiteContext<T> {
    fn clone(&self) -> Self {
        SuiteContext {
            class: self.class,
            slot: Arc::clone(&self.slot),
        }
    }
}
