//! Runegrid runs two phases of worker threads over one shared canvas state and merges what
//! they leave behind.
//!
//! 1. **Phase 1**: a grid stacker and a recolorer run concurrently under [`SyncPolicy::Locked`],
//!    so each one's whole run is atomic with respect to the other.
//! 2. **Snapshot**: `result := intermediate`.
//! 3. **Phase 2**: the same pair runs under [`SyncPolicy::Unlocked`] and interleaves freely.
//! 4. **Merge**: `beside(result, intermediate)` is handed to [`DrawingEngine::show`].
//!
//! Drawing is abstracted behind [`DrawingEngine`]; [`RasterEngine`] is the bundled CPU engine.
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod foundation;
pub mod modifier;
pub mod orchestrator;
pub mod raster;
pub mod state;
pub mod worker;

pub use config::{BaseSpec, ScenarioConfig};
pub use engine::DrawingEngine;
pub use foundation::core::RepeatCount;
pub use foundation::error::{RunesError, RunesResult};
pub use modifier::{Modifier, ModifierKind};
pub use orchestrator::{
    Orchestrator, OrchestratorPhase, OrchestratorSettings, PhasePlan, RunReport,
};
pub use raster::{Color, Primitive, RasterCanvas, RasterEngine};
pub use state::{CanvasSlots, ExclusiveRun, SharedCanvasState};
pub use worker::{
    CancelToken, DEFAULT_PAUSE, FaultPlan, SyncPolicy, Worker, WorkerOutcome, WorkerReport,
};
