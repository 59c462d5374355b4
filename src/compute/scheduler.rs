//! Frame work-budget calculator.
//!
//! Spreads one full pipeline cycle (`stage_multiplier` lattice passes) across however
//! many frames fit in `run_period`, whatever the host frame rate.

use crate::schema::SimMode;

use super::Stage;

/// What the state machine should do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePlan {
    /// Run timer expired: restart the pipeline and do no kernel work.
    Restart,
    /// Process up to `budget` cells.
    Run { budget: usize },
}

/// Tracks the per-cell time budget and the periodic run timer.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    run_period: f32,
    volume: usize,
    stage_multiplier: u32,
    time_per_cell: f32,
    run_timer: f32,
    cells_this_frame: usize,
}

impl FrameScheduler {
    pub fn new(run_period: f32, volume: usize, mode: SimMode) -> Self {
        let mut scheduler = Self {
            run_period,
            volume,
            stage_multiplier: 0,
            time_per_cell: 0.0,
            run_timer: 0.0,
            cells_this_frame: 0,
        };
        scheduler.set_mode(mode);
        scheduler
    }

    /// Recompute the per-cell budget for `mode`'s pass count.
    pub fn set_mode(&mut self, mode: SimMode) {
        self.stage_multiplier = mode.stage_multiplier();
        self.time_per_cell =
            self.run_period / (self.volume as f32 * self.stage_multiplier as f32);
    }

    /// Seconds of frame time one cell visit is worth.
    #[inline]
    pub fn time_per_cell(&self) -> f32 {
        self.time_per_cell
    }

    #[inline]
    pub fn stage_multiplier(&self) -> u32 {
        self.stage_multiplier
    }

    #[inline]
    pub fn run_period(&self) -> f32 {
        self.run_period
    }

    #[inline]
    pub fn run_timer(&self) -> f32 {
        self.run_timer
    }

    /// Budget computed on the last frame that was not a texture frame.
    #[inline]
    pub fn cells_this_frame(&self) -> usize {
        self.cells_this_frame
    }

    /// `ceil(elapsed / time_per_cell) + 1`.
    ///
    /// The `+ 1` keeps the sweep moving when frames are much shorter than a cell's
    /// share of the period, at the price of a slight overrun.
    /// Saturates at `usize::MAX` for very long stalls.
    pub fn budget_for(&self, elapsed: f32) -> usize {
        ((elapsed / self.time_per_cell).ceil() as usize).saturating_add(1)
    }

    pub fn reset_timer(&mut self) {
        self.run_timer = 0.0;
    }

    /// Advance the run timer and decide this frame's work.
    ///
    /// The expiry check happens before `elapsed` is added, so the frame that finds the
    /// timer past `run_period` only restarts.
    pub fn plan_frame(&mut self, elapsed: f32, stage: Stage) -> FramePlan {
        if self.run_timer > self.run_period {
            self.run_timer = 0.0;
            return FramePlan::Restart;
        }
        self.run_timer += elapsed;

        if stage != Stage::Texture {
            self.cells_this_frame = self.budget_for(elapsed);
        }
        FramePlan::Run {
            budget: self.cells_this_frame,
        }
    }
}
