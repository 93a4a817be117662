use crate::{
    engine::DrawingEngine,
    foundation::{
        core::RepeatCount,
        error::{RunesError, RunesResult},
    },
    state::SharedCanvasState,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Replace `base` with a randomly recolored copy of itself.
    RecolorRandom,
    /// Blend a fresh vertical stack of `base` into `intermediate`.
    GridStack,
}

impl ModifierKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::RecolorRandom => "recolor",
            Self::GridStack => "grid",
        }
    }
}

/// One transformation step, applied `repeat` times by a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub repeat: RepeatCount,
}

impl Modifier {
    pub fn new(kind: ModifierKind, repeat: RepeatCount) -> Self {
        Self { kind, repeat }
    }

    /// Number of copies a grid stack lays out vertically.
    pub fn stack_copies(&self) -> u32 {
        self.repeat.get().saturating_mul(2)
    }

    /// Apply the modification for 1-based `step`.
    ///
    /// Every slot access is a separate guarded call; callers that need the whole sequence to be
    /// atomic must hold the state's run lock around it.
    pub fn apply<E: DrawingEngine>(
        &self,
        engine: &E,
        state: &SharedCanvasState<E::Canvas>,
        step: u32,
    ) -> RunesResult<()> {
        match self.kind {
            ModifierKind::RecolorRandom => {
                let base = state.base();
                state.set_base(engine.random_color(&base));
            }
            ModifierKind::GridStack => {
                if step == 0 {
                    return Err(RunesError::evaluation("modifier steps are 1-based"));
                }
                let copies = self.stack_copies();
                state.init_intermediate_with(|base| engine.stack_n(copies, base));

                let fresh = engine.stack_n(copies, &state.base());
                let current = state
                    .intermediate()
                    .ok_or_else(|| RunesError::evaluation("intermediate canvas vanished"))?;
                let frac = 1.0 / f64::from(step);
                state.replace_intermediate(engine.beside_frac(frac, &fresh, &current));
            }
        }
        Ok(())
    }
}
