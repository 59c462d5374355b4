//! Frame-driven simulator - Stage state machine over the lattice.
//!
//! Each host frame calls [`CloudSimulator::advance`]. The scheduler turns the frame's
//! elapsed time into a cell budget, and [`step`] spends it on the current stage,
//! resuming from wherever the cursor stopped on the previous frame.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::schema::{ConfigError, Seed, SimMode, SimulationConfig};
use crate::texture::{DropletSnapshot, NullSink, TextureSink, TextureStatus};

use super::{
    CycleReport, FramePlan, FrameScheduler, Lattice, Stage, Sweep, SweepCursor,
    apply_stage_cell, degenerate_layers, run_cycle,
};

/// Camera the rendering collaborator should show. The simulator only stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraId {
    #[default]
    Free,
    Cloud,
    Texture,
}

/// Resumable pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimContext {
    pub mode: SimMode,
    pub stage: Stage,
    pub cursor: SweepCursor,
}

impl SimContext {
    /// Entry stage of `mode` with the cursor at the origin.
    pub fn new(mode: SimMode) -> Self {
        Self {
            mode,
            stage: Stage::entry(mode),
            cursor: SweepCursor::origin(),
        }
    }

    /// Back to the entry stage and origin, keeping the mode.
    pub fn restart(&mut self) {
        self.stage = Stage::entry(self.mode);
        self.cursor.reset();
    }
}

/// Result of one call to [`step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Cells processed.
    pub visited: usize,
    /// Stage whose sweep finished during this call, if any.
    pub completed: Option<Stage>,
}

/// Spend up to `budget` cells on the current stage.
///
/// Stops early when the sweep completes: the context moves to the next stage, the
/// cursor returns to the origin and the rest of the budget is discarded.
///
/// # Panics
/// If the context is on [`Stage::Texture`], on a stage outside its mode, or the cursor
/// lies outside the lattice.
pub fn step(
    ctx: &mut SimContext,
    lattice: &mut Lattice,
    budget: usize,
    config: &SimulationConfig,
) -> StepOutcome {
    let dims = lattice.dims();
    assert!(
        ctx.cursor.is_within(dims),
        "cursor {:?} outside {:?} lattice",
        ctx.cursor,
        dims
    );
    assert!(
        ctx.stage.is_lattice_pass() && ctx.stage.belongs_to(ctx.mode),
        "stage {:?} cannot sweep the lattice in {:?} mode",
        ctx.stage,
        ctx.mode
    );

    let mut visited = 0;
    while visited < budget {
        let SweepCursor { x, y, z, .. } = ctx.cursor;
        apply_stage_cell(ctx.stage, lattice, x, y, z, config);
        visited += 1;

        if ctx.cursor.advance(dims) == Sweep::Complete {
            let completed = ctx.stage;
            ctx.stage = completed.next(ctx.mode);
            debug!("{:?} sweep complete, next stage {:?}", completed, ctx.stage);
            return StepOutcome {
                visited,
                completed: Some(completed),
            };
        }
    }

    StepOutcome {
        visited,
        completed: None,
    }
}

/// What happened during one [`CloudSimulator::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// The run timer expired and the pipeline restarted.
    pub restarted: bool,
    /// Cell budget granted for this frame.
    pub budget: usize,
    /// Cells actually processed.
    pub visited: usize,
    /// Stage finished this frame (including `Texture`), if any.
    pub completed: Option<Stage>,
}

/// Incremental cloud simulator driven by host frames.
pub struct CloudSimulator {
    config: SimulationConfig,
    lattice: Lattice,
    context: SimContext,
    scheduler: FrameScheduler,
    camera: CameraId,
    cycles_completed: u64,
    frames: u64,
}

impl CloudSimulator {
    /// Validate `config` and build a zeroed lattice at the configured mode's entry stage.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let degenerate = degenerate_layers(config.depth, &config.atmosphere, 1e-3);
        if !degenerate.is_empty() {
            warn!(
                "layers {:?} sit on the saturation pole; w_max is unbounded there",
                degenerate
            );
        }

        let lattice = Lattice::new(config.width, config.height, config.depth);
        let scheduler = FrameScheduler::new(config.run_period, config.volume(), config.mode);
        info!(
            "cloud lattice {}x{}x{} in {:?} mode, {:.6}s per cell",
            config.width,
            config.height,
            config.depth,
            config.mode,
            scheduler.time_per_cell()
        );

        Ok(Self {
            context: SimContext::new(config.mode),
            config,
            lattice,
            scheduler,
            camera: CameraId::default(),
            cycles_completed: 0,
            frames: 0,
        })
    }

    /// Like [`CloudSimulator::new`], then fill the lattice from `seed`.
    pub fn with_seed(config: SimulationConfig, seed: &Seed) -> Result<Self, ConfigError> {
        seed.validate()?;
        let mut sim = Self::new(config)?;
        seed.apply(&mut sim.lattice);
        Ok(sim)
    }

    /// Advance one host frame, completing texture stages immediately.
    pub fn advance(&mut self, elapsed: f32) -> FrameReport {
        self.advance_with(elapsed, &mut NullSink)
    }

    /// Advance one host frame, presenting finished frames to `sink`.
    pub fn advance_with<S: TextureSink + ?Sized>(
        &mut self,
        elapsed: f32,
        sink: &mut S,
    ) -> FrameReport {
        self.frames += 1;
        let elapsed = if elapsed.is_finite() && elapsed >= 0.0 {
            elapsed
        } else {
            warn!("ignoring invalid frame time {}", elapsed);
            0.0
        };

        let budget = match self.scheduler.plan_frame(elapsed, self.context.stage) {
            FramePlan::Restart => {
                info!(
                    "run period elapsed at {:?}, restarting pipeline",
                    self.context.stage
                );
                self.context.restart();
                self.lattice.clear_accum();
                return FrameReport {
                    restarted: true,
                    budget: 0,
                    visited: 0,
                    completed: None,
                };
            }
            FramePlan::Run { budget } => budget,
        };

        if self.context.stage == Stage::Texture {
            let status = sink.present(&DropletSnapshot::new(&self.lattice));
            let mut completed = None;
            if status == TextureStatus::Done {
                self.context.stage = Stage::Texture.next(self.context.mode);
                self.cycles_completed += 1;
                debug!("cycle {} presented", self.cycles_completed);
                completed = Some(Stage::Texture);
            }
            return FrameReport {
                restarted: false,
                budget,
                visited: 0,
                completed,
            };
        }

        let outcome = step(&mut self.context, &mut self.lattice, budget, &self.config);
        debug_assert!(
            self.context.stage.is_advection() || self.lattice.accum_is_clear(),
            "accum buffers left dirty entering {:?}",
            self.context.stage
        );
        FrameReport {
            restarted: false,
            budget,
            visited: outcome.visited,
            completed: outcome.completed,
        }
    }

    /// Run a whole pipeline cycle at once on the batch path, then present it to `sink`.
    ///
    /// Any in-flight sweep is discarded first. The context ends at the entry stage.
    pub fn run_batch_cycle<S: TextureSink + ?Sized>(&mut self, sink: &mut S) -> CycleReport {
        self.context.restart();
        self.lattice.clear_accum();
        let report = run_cycle(&mut self.lattice, &self.config, self.context.mode);
        if sink.present(&DropletSnapshot::new(&self.lattice)) == TextureStatus::Pending {
            debug!("batch cycle presented to a pending sink");
        }
        self.cycles_completed += 1;
        report
    }

    /// Switch simulation mode, discarding any in-flight sweep.
    ///
    /// Entering physics mode also zeroes the lattice and adds one vapor source dose.
    pub fn switch_mode(&mut self, mode: SimMode) {
        info!("switching to {:?} mode", mode);
        self.context = SimContext::new(mode);
        self.scheduler.set_mode(mode);
        self.scheduler.reset_timer();
        match mode {
            SimMode::Physics => {
                self.lattice.reset();
                self.lattice.add_vapor_source(self.config.vapor_source_dose);
            }
            SimMode::Diagnostic => self.lattice.clear_accum(),
        }
    }

    /// Record the camera the renderer should use. Has no effect on the simulation.
    pub fn switch_camera(&mut self, camera: CameraId) {
        self.camera = camera;
    }

    pub fn camera(&self) -> CameraId {
        self.camera
    }

    /// Read-only view of the droplets field.
    pub fn snapshot(&self) -> DropletSnapshot<'_> {
        DropletSnapshot::new(&self.lattice)
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn context(&self) -> &SimContext {
        &self.context
    }

    pub fn mode(&self) -> SimMode {
        self.context.mode
    }

    pub fn stage(&self) -> Stage {
        self.context.stage
    }

    pub fn cursor(&self) -> SweepCursor {
        self.context.cursor
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn cells_this_frame(&self) -> usize {
        self.scheduler.cells_this_frame()
    }

    pub fn run_timer(&self) -> f32 {
        self.scheduler.run_timer()
    }

    /// Number of texture hand-offs so far.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Number of `advance` calls so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
