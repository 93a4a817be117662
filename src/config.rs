use std::{fs::File, io::BufReader, path::Path, time::Duration};

use anyhow::Context as _;

use crate::{
    foundation::{
        core::RepeatCount,
        error::{RunesError, RunesResult},
    },
    modifier::ModifierKind,
    orchestrator::{OrchestratorSettings, PhasePlan},
    raster::{Color, Primitive, RasterCanvas, RasterEngine},
};

/// Starting canvas: a primitive painted in one color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BaseSpec {
    pub shape: Primitive,
    pub color: Color,
}

impl Default for BaseSpec {
    fn default() -> Self {
        Self {
            shape: Primitive::Heart,
            color: Color::Blue,
        }
    }
}

/// A complete run description, loadable from JSON.
///
/// Every field has a default; `{}` describes a blue heart run through both phases with five
/// iterations per worker and a 10 ms pause.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub canvas_size: u32,
    pub base: BaseSpec,
    pub pause_ms: u64,
    pub phase1: PhasePlan,
    pub phase2: PhasePlan,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let five = RepeatCount::DEFAULT;
        Self {
            canvas_size: 256,
            base: BaseSpec::default(),
            pause_ms: 10,
            phase1: PhasePlan::new(five, five),
            phase2: PhasePlan::new(five, five),
        }
    }
}

impl ScenarioConfig {
    pub fn from_json_str(s: &str) -> RunesResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> RunesResult<Self> {
        let f = File::open(path).with_context(|| format!("open scenario '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_pretty(&self) -> RunesResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> RunesResult<()> {
        RasterEngine::new(self.canvas_size)?;
        for (label, plan) in [("phase1", &self.phase1), ("phase2", &self.phase2)] {
            let Some(fault) = plan.fault else {
                continue;
            };
            let repeat = match plan.fault_kind {
                ModifierKind::GridStack => plan.grid_repeat,
                ModifierKind::RecolorRandom => plan.recolor_repeat,
            };
            if fault.at_step == 0 || fault.at_step > repeat.get() {
                return Err(RunesError::validation(format!(
                    "{label}: fault step {} is outside 1..={repeat}",
                    fault.at_step
                )));
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            pause: Duration::from_millis(self.pause_ms),
            phase1: self.phase1,
            phase2: self.phase2,
        }
    }

    pub fn engine(&self) -> RunesResult<RasterEngine> {
        RasterEngine::new(self.canvas_size)
    }

    pub fn base_canvas(&self, engine: &RasterEngine) -> RasterCanvas {
        engine.primitive(self.base.shape, self.base.color)
    }
}
