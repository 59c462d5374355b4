//! Pipeline stages and the transition table between them.

use serde::{Deserialize, Serialize};

use crate::schema::SimMode;

/// One lattice pass (or the external texture hand-off) of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Velocity,
    Diffuse,
    AdvectScatter,
    AdvectGather,
    Transition,
    /// Rendering collaborator consumes the finished droplets.
    Texture,
    /// Diagnostic half-and-half fill.
    Test,
}

const PHYSICS_PIPELINE: [Stage; 6] = [
    Stage::Velocity,
    Stage::Diffuse,
    Stage::AdvectScatter,
    Stage::AdvectGather,
    Stage::Transition,
    Stage::Texture,
];

const DIAGNOSTIC_PIPELINE: [Stage; 2] = [Stage::Test, Stage::Texture];

impl Stage {
    /// Stages of `mode` in execution order. The last entry loops back to the first.
    pub fn pipeline(mode: SimMode) -> &'static [Stage] {
        match mode {
            SimMode::Physics => &PHYSICS_PIPELINE,
            SimMode::Diagnostic => &DIAGNOSTIC_PIPELINE,
        }
    }

    /// First stage of `mode`'s cycle.
    #[inline]
    pub fn entry(mode: SimMode) -> Stage {
        Stage::pipeline(mode)[0]
    }

    pub fn belongs_to(self, mode: SimMode) -> bool {
        Stage::pipeline(mode).contains(&self)
    }

    /// Stage that follows `self` in `mode`.
    ///
    /// # Panics
    /// If `self` is not part of `mode`'s pipeline.
    pub fn next(self, mode: SimMode) -> Stage {
        match (mode, self) {
            (SimMode::Physics, Stage::Velocity) => Stage::Diffuse,
            (SimMode::Physics, Stage::Diffuse) => Stage::AdvectScatter,
            (SimMode::Physics, Stage::AdvectScatter) => Stage::AdvectGather,
            (SimMode::Physics, Stage::AdvectGather) => Stage::Transition,
            (SimMode::Physics, Stage::Transition) => Stage::Texture,
            (SimMode::Physics, Stage::Texture) => Stage::Velocity,
            (SimMode::Diagnostic, Stage::Test) => Stage::Texture,
            (SimMode::Diagnostic, Stage::Texture) => Stage::Test,
            (mode, stage) => panic!("stage {:?} is not part of the {:?} pipeline", stage, mode),
        }
    }

    /// True for stages that sweep the lattice cell by cell.
    #[inline]
    pub fn is_lattice_pass(self) -> bool {
        self != Stage::Texture
    }

    /// True while `accum` may hold scattered water.
    #[inline]
    pub fn is_advection(self) -> bool {
        matches!(self, Stage::AdvectScatter | Stage::AdvectGather)
    }
}
