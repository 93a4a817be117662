use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crate::{
    engine::DrawingEngine,
    foundation::error::{RunesError, RunesResult},
    modifier::{Modifier, ModifierKind},
    state::{ExclusiveRun, SharedCanvasState},
};

/// Simulated work between two iterations.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(10);

/// How a worker coordinates with other workers on the same state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Hold the state's run lock for the entire run.
    Locked,
    /// No access control beyond per-slot atomicity.
    Unlocked,
}

impl SyncPolicy {
    /// Acquire whatever this policy requires before a run. The returned guard (if any) must live
    /// until the run ends.
    pub fn enter<C: Clone>(self, state: &SharedCanvasState<C>) -> Option<ExclusiveRun<'_>> {
        match self {
            Self::Locked => Some(state.exclusive()),
            Self::Unlocked => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }
}

/// Cooperative cancellation flag, checked by workers between iterations.
///
/// There is no reset. A cancelled token stays cancelled for every worker it is handed to.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Deliberate iteration fault, raised when the worker reaches `at_step` (1-based) and before that
/// step is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FaultPlan {
    pub at_step: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed,
    Failed { step: u32, message: String },
    Cancelled { before_step: u32 },
    /// An iteration unwound. Iterations before it stay applied.
    Panicked { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    pub name: String,
    pub kind: ModifierKind,
    pub policy: SyncPolicy,
    pub outcome: WorkerOutcome,
    pub steps_completed: u32,
}

impl WorkerReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == WorkerOutcome::Completed
    }
}

/// Applies a [`Modifier`] `repeat` times under a [`SyncPolicy`]. Runs once.
#[derive(Clone, Debug)]
pub struct Worker {
    name: String,
    modifier: Modifier,
    policy: SyncPolicy,
    pause: Duration,
    fault: Option<FaultPlan>,
    cancel: CancelToken,
}

enum LoopExit {
    Completed,
    Cancelled { before_step: u32 },
    Panicked { step: u32, message: String },
}

impl Worker {
    pub fn new(name: impl Into<String>, modifier: Modifier, policy: SyncPolicy) -> Self {
        Self {
            name: name.into(),
            modifier,
            policy,
            pause: DEFAULT_PAUSE,
            fault: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_fault(mut self, fault: FaultPlan) -> RunesResult<Self> {
        if fault.at_step == 0 || fault.at_step > self.modifier.repeat.get() {
            return Err(RunesError::validation(format!(
                "fault step {} is outside 1..={} for worker '{}'",
                fault.at_step, self.modifier.repeat, self.name
            )));
        }
        self.fault = Some(fault);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Run every iteration, then hand back a report. Iteration faults and panics raised while
    /// applying an iteration end the run early and are logged here; they are never returned as
    /// errors or propagated as unwinds.
    #[tracing::instrument(
        skip(self, engine, state),
        fields(worker = %self.name, policy = self.policy.label(), kind = self.modifier.kind.label())
    )]
    pub fn run<E: DrawingEngine>(
        self,
        engine: &E,
        state: &SharedCanvasState<E::Canvas>,
    ) -> WorkerReport {
        let _run = self.policy.enter(state);
        tracing::debug!(repeat = self.modifier.repeat.get(), "worker running");

        let mut completed = 0u32;
        let outcome = match self.iterate(engine, state, &mut completed) {
            Ok(LoopExit::Completed) => {
                tracing::debug!(steps = completed, "worker completed");
                WorkerOutcome::Completed
            }
            Ok(LoopExit::Cancelled { before_step }) => {
                tracing::info!(steps = completed, before_step, "worker cancelled");
                WorkerOutcome::Cancelled { before_step }
            }
            Ok(LoopExit::Panicked { step, message }) => {
                tracing::error!(step, %message, steps = completed, "worker panicked");
                WorkerOutcome::Panicked { message }
            }
            Err(err) => {
                tracing::error!(error = %err, steps = completed, "worker failed");
                match err {
                    RunesError::Iteration { step, message, .. } => {
                        WorkerOutcome::Failed { step, message }
                    }
                    other => WorkerOutcome::Failed {
                        step: completed + 1,
                        message: other.to_string(),
                    },
                }
            }
        };

        WorkerReport {
            name: self.name,
            kind: self.modifier.kind,
            policy: self.policy,
            outcome,
            steps_completed: completed,
        }
    }

    fn iterate<E: DrawingEngine>(
        &self,
        engine: &E,
        state: &SharedCanvasState<E::Canvas>,
        completed: &mut u32,
    ) -> RunesResult<LoopExit> {
        for step in self.modifier.repeat.steps() {
            if self.cancel.is_cancelled() {
                return Ok(LoopExit::Cancelled { before_step: step });
            }
            if self.fault.is_some_and(|f| f.at_step == step) {
                return Err(RunesError::iteration(&self.name, step, "injected fault"));
            }

            // Slot mutexes poisoned by the unwind are recovered on their next access.
            match catch_unwind(AssertUnwindSafe(|| self.modifier.apply(engine, state, step))) {
                Ok(applied) => {
                    applied.map_err(|e| RunesError::iteration(&self.name, step, e.to_string()))?
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    return Ok(LoopExit::Panicked { step, message });
                }
            }
            *completed = step;
            tracing::trace!(step, "iteration applied");

            std::thread::sleep(self.pause);
        }
        Ok(LoopExit::Completed)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::RepeatCount;

    fn grid(n: u32) -> Modifier {
        Modifier::new(ModifierKind::GridStack, RepeatCount::new(n).unwrap())
    }

    #[test]
    fn fault_step_must_be_within_repeat() {
        let w = Worker::new("w", grid(6), SyncPolicy::Locked);
        assert!(w.clone().with_fault(FaultPlan { at_step: 0 }).is_err());
        assert!(w.clone().with_fault(FaultPlan { at_step: 7 }).is_err());
        assert!(w.with_fault(FaultPlan { at_step: 6 }).is_ok());
    }

    #[test]
    fn panic_payloads_become_messages() {
        let caught = catch_unwind(|| panic!("step {} broke", 3)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "step 3 broke");
        let caught = catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(caught.as_ref()), "non-string panic payload");
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn unlocked_policy_takes_no_guard() {
        let state = SharedCanvasState::new(0u8);
        assert!(SyncPolicy::Unlocked.enter(&state).is_none());
        let held = SyncPolicy::Locked.enter(&state);
        assert!(held.is_some());
    }
}
