use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    engine::DrawingEngine,
    foundation::{core::RepeatCount, error::RunesResult},
    modifier::{Modifier, ModifierKind},
    state::{CanvasSlots, SharedCanvasState},
    worker::{
        CancelToken, DEFAULT_PAUSE, FaultPlan, SyncPolicy, Worker, WorkerOutcome, WorkerReport,
        panic_message,
    },
};

type Job<T> = Box<dyn FnOnce() -> T + Send + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrchestratorPhase {
    Init,
    Phase1Running,
    Phase1Joined,
    Phase2Running,
    Phase2Joined,
    Merged,
    Done,
}

/// Worker pair for one phase: one grid stacker and one recolorer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PhasePlan {
    pub grid_repeat: RepeatCount,
    pub recolor_repeat: RepeatCount,
    /// Injected fault, targeted at the worker of `fault_kind`.
    #[serde(default)]
    pub fault: Option<FaultPlan>,
    #[serde(default = "default_fault_kind")]
    pub fault_kind: ModifierKind,
}

fn default_fault_kind() -> ModifierKind {
    ModifierKind::GridStack
}

impl PhasePlan {
    pub fn new(grid_repeat: RepeatCount, recolor_repeat: RepeatCount) -> Self {
        Self {
            grid_repeat,
            recolor_repeat,
            fault: None,
            fault_kind: default_fault_kind(),
        }
    }

    pub fn with_fault(mut self, kind: ModifierKind, fault: FaultPlan) -> Self {
        self.fault = Some(fault);
        self.fault_kind = kind;
        self
    }

    fn modifiers(&self) -> [Modifier; 2] {
        [
            Modifier::new(ModifierKind::GridStack, self.grid_repeat),
            Modifier::new(ModifierKind::RecolorRandom, self.recolor_repeat),
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorSettings {
    pub pause: Duration,
    pub phase1: PhasePlan,
    pub phase2: PhasePlan,
}

impl OrchestratorSettings {
    pub fn uniform(repeat: RepeatCount) -> Self {
        Self {
            pause: DEFAULT_PAUSE,
            phase1: PhasePlan::new(repeat, repeat),
            phase2: PhasePlan::new(repeat, repeat),
        }
    }
}

/// Everything observable about one orchestrated run.
#[derive(Clone, Debug)]
pub struct RunReport<C> {
    pub final_canvas: C,
    /// `intermediate` as copied into `result` between the phases.
    pub phase1_snapshot: Option<C>,
    /// Slots as they stood after the phase 2 barrier.
    pub slots: CanvasSlots<C>,
    pub phase1: Vec<WorkerReport>,
    pub phase2: Vec<WorkerReport>,
    pub trail: Vec<OrchestratorPhase>,
}

impl<C> RunReport<C> {
    pub fn reached_done(&self) -> bool {
        self.trail.last() == Some(&OrchestratorPhase::Done)
    }
}

/// Drives the two-phase run: locked pair, snapshot, unlocked pair, merge, show.
pub struct Orchestrator<E: DrawingEngine> {
    engine: Arc<E>,
    settings: OrchestratorSettings,
    cancel: CancelToken,
}

impl<E> Orchestrator<E>
where
    E: DrawingEngine + 'static,
{
    pub fn new(engine: Arc<E>, settings: OrchestratorSettings) -> RunesResult<Self> {
        // Surface bad fault plans before any thread starts.
        for (plan, policy) in [
            (&settings.phase1, SyncPolicy::Locked),
            (&settings.phase2, SyncPolicy::Unlocked),
        ] {
            build_workers(plan, policy, &settings, &CancelToken::new())?;
        }
        Ok(Self {
            engine,
            settings,
            cancel: CancelToken::new(),
        })
    }

    /// Token shared with every worker this orchestrator spawns.
    ///
    /// Cancellation is permanent: the token is never reset, so once it is cancelled every later
    /// [`Orchestrator::run`] on this orchestrator also reports all workers as cancelled. Build a
    /// new orchestrator to run again.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    #[tracing::instrument(skip_all)]
    pub fn run(&self, base: E::Canvas) -> RunesResult<RunReport<E::Canvas>> {
        let mut trail = Vec::with_capacity(7);
        let mut enter = |phase: OrchestratorPhase| {
            tracing::info!(?phase, "orchestrator phase");
            trail.push(phase);
        };

        enter(OrchestratorPhase::Init);
        let state = Arc::new(SharedCanvasState::new(base));

        enter(OrchestratorPhase::Phase1Running);
        let phase1 = self.run_phase(&state, &self.settings.phase1, SyncPolicy::Locked)?;
        enter(OrchestratorPhase::Phase1Joined);

        let phase1_snapshot = state.snapshot_result();

        enter(OrchestratorPhase::Phase2Running);
        let phase2 = self.run_phase(&state, &self.settings.phase2, SyncPolicy::Unlocked)?;
        enter(OrchestratorPhase::Phase2Joined);

        let slots = state.slots();
        let final_canvas = self.merge(&slots);
        enter(OrchestratorPhase::Merged);

        self.engine.show(&final_canvas)?;
        enter(OrchestratorPhase::Done);

        Ok(RunReport {
            final_canvas,
            phase1_snapshot,
            slots,
            phase1,
            phase2,
            trail,
        })
    }

    /// Spawn the phase's workers and block until all of them have finished, whatever the
    /// outcome.
    fn run_phase(
        &self,
        state: &Arc<SharedCanvasState<E::Canvas>>,
        plan: &PhasePlan,
        policy: SyncPolicy,
    ) -> RunesResult<Vec<WorkerReport>> {
        let workers = build_workers(plan, policy, &self.settings, &self.cancel)?;

        let mut meta = Vec::with_capacity(workers.len());
        let mut jobs: Vec<(String, Job<WorkerReport>)> = Vec::with_capacity(workers.len());
        for worker in workers {
            let engine = Arc::clone(&self.engine);
            let state = Arc::clone(state);
            let name = worker.name().to_string();
            meta.push((name.clone(), worker.modifier().kind));
            let job: Job<WorkerReport> = Box::new(move || worker.run(engine.as_ref(), &state));
            jobs.push((name, job));
        }

        let joined = spawn_and_join(jobs, spawn_named)?;
        let reports = meta
            .into_iter()
            .zip(joined)
            .map(|((name, kind), joined)| {
                // Panics inside an iteration are reported by the worker itself; this only sees
                // unwinds from outside the iteration loop.
                joined.unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(worker = %name, %message, "worker thread panicked");
                    WorkerReport {
                        name,
                        kind,
                        policy,
                        outcome: WorkerOutcome::Panicked { message },
                        steps_completed: 0,
                    }
                })
            })
            .collect();
        Ok(reports)
    }

    fn merge(&self, slots: &CanvasSlots<E::Canvas>) -> E::Canvas {
        let left = slots.result.clone().unwrap_or_else(|| {
            tracing::warn!("result slot empty at merge; using base");
            slots.base.clone()
        });
        let right = slots.intermediate.clone().unwrap_or_else(|| {
            tracing::warn!("intermediate slot empty at merge; using base");
            slots.base.clone()
        });
        self.engine.beside(&left, &right)
    }
}

fn build_workers(
    plan: &PhasePlan,
    policy: SyncPolicy,
    settings: &OrchestratorSettings,
    cancel: &CancelToken,
) -> RunesResult<Vec<Worker>> {
    plan.modifiers()
        .into_iter()
        .map(|modifier| {
            let name = format!("{}-{}", modifier.kind.label(), policy.label());
            let worker = Worker::new(name, modifier, policy)
                .with_pause(settings.pause)
                .with_cancel(cancel.clone());
            match plan.fault {
                Some(fault) if plan.fault_kind == modifier.kind => worker.with_fault(fault),
                _ => Ok(worker),
            }
        })
        .collect()
}

fn spawn_named<T: Send + 'static>(name: String, job: Job<T>) -> io::Result<JoinHandle<T>> {
    thread::Builder::new().name(name).spawn(job)
}

/// Start one named thread per job, then join them all in order.
///
/// When a spawn fails, the threads already started are joined before the error is returned, so
/// no worker of the phase outlives it.
fn spawn_and_join<T: Send + 'static>(
    jobs: Vec<(String, Job<T>)>,
    mut spawn: impl FnMut(String, Job<T>) -> io::Result<JoinHandle<T>>,
) -> RunesResult<Vec<thread::Result<T>>> {
    let mut handles = Vec::with_capacity(jobs.len());
    for (name, job) in jobs {
        match spawn(name.clone(), job) {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                tracing::error!(worker = %name, error = %err, "failed to spawn worker thread");
                for handle in handles {
                    let _ = handle.join();
                }
                let err = anyhow::Error::from(err)
                    .context(format!("spawning worker thread '{name}'"));
                return Err(err.into());
            }
        }
    }
    Ok(handles.into_iter().map(JoinHandle::join).collect())
}
