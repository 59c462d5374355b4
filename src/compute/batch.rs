//! Whole-cycle batch path.
//!
//! Runs every lattice stage of a pipeline in one call instead of spreading it over
//! frames. Point-wise stages go wide over z-slabs with rayon; scatter partitions
//! into per-slab accum buffers that are summed afterwards.

use rayon::prelude::*;

use crate::schema::{SimMode, SimulationConfig};

use super::kernels::scatter_into;
use super::{Lattice, Stage, apply_stage_cell, layer_temperature, saturation_capacity};

/// Summary of one batch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Lattice passes run.
    pub passes: usize,
    /// Cells whose water was scattered off the lattice.
    pub dropped_cells: usize,
}

/// Run one full pass of every lattice stage in `mode`'s pipeline, in order.
pub fn run_cycle(lattice: &mut Lattice, config: &SimulationConfig, mode: SimMode) -> CycleReport {
    let mut report = CycleReport::default();
    for &stage in Stage::pipeline(mode) {
        if !stage.is_lattice_pass() {
            continue;
        }
        match stage {
            Stage::AdvectScatter => report.dropped_cells += scatter_pass(lattice),
            Stage::AdvectGather => gather_pass(lattice),
            Stage::Transition => transition_pass(lattice, config),
            Stage::Test => half_and_half_pass(lattice),
            _ => sequential_pass(lattice, stage, config),
        }
        report.passes += 1;
    }
    report
}

/// In-place sweep in lattice order. Later cells read neighbours already updated.
pub fn sequential_pass(lattice: &mut Lattice, stage: Stage, config: &SimulationConfig) {
    let (width, height, depth) = lattice.dims();
    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                apply_stage_cell(stage, lattice, x, y, z, config);
            }
        }
    }
}

/// Slabs each scatter job must take so that at most `threads` private buffers exist.
fn slabs_per_job(depth: usize, threads: usize) -> usize {
    depth.div_ceil(threads.max(1)).max(1)
}

/// Scatter every cell in parallel. Returns the number of cells whose target was rejected.
///
/// Each job owns one full-volume accum buffer, so jobs are capped at the pool size.
pub fn scatter_pass(lattice: &mut Lattice) -> usize {
    let dims = lattice.dims();
    let (width, height, depth) = dims;
    let layer = width * height;
    let volume = lattice.volume();
    let min_len = slabs_per_job(depth, rayon::current_num_threads());

    let (accum, dropped) = lattice
        .cells_mut()
        .par_chunks_mut(layer)
        .enumerate()
        .with_min_len(min_len)
        .fold(
            || (vec![[0.0f32; 2]; volume], 0usize),
            |(mut accum, mut dropped), (z, slab)| {
                for (i, cell) in slab.iter_mut().enumerate() {
                    let (x, y) = (i % width, i / width);
                    if !scatter_into(
                        dims,
                        x,
                        y,
                        z,
                        cell.vapor,
                        cell.droplets,
                        cell.velocity,
                        &mut accum,
                    ) {
                        dropped += 1;
                    }
                    cell.vapor = 0.0;
                    cell.droplets = 0.0;
                }
                (accum, dropped)
            },
        )
        .reduce_with(|(mut a, dropped_a), (b, dropped_b)| {
            for (sum, part) in a.iter_mut().zip(&b) {
                sum[0] += part[0];
                sum[1] += part[1];
            }
            (a, dropped_a + dropped_b)
        })
        .unwrap_or_else(|| (vec![[0.0f32; 2]; volume], 0));

    lattice
        .cells_mut()
        .par_iter_mut()
        .zip(accum.par_iter())
        .for_each(|(cell, &[vapor, droplets])| {
            cell.accum.vapor += vapor;
            cell.accum.droplets += droplets;
        });
    dropped
}

pub fn gather_pass(lattice: &mut Lattice) {
    lattice.cells_mut().par_iter_mut().for_each(|cell| {
        cell.vapor += cell.accum.vapor;
        cell.droplets += cell.accum.droplets;
        cell.accum = Default::default();
    });
}

/// Phase transition per z-slab; each slab shares one saturation capacity.
pub fn transition_pass(lattice: &mut Lattice, config: &SimulationConfig) {
    let (width, height, depth) = lattice.dims();
    let rate = config.coefficients.phase_transition_rate;
    let atmosphere = &config.atmosphere;

    lattice
        .cells_mut()
        .par_chunks_mut(width * height)
        .enumerate()
        .for_each(|(z, slab)| {
            let w_max = saturation_capacity(layer_temperature(z, depth, atmosphere));
            for cell in slab {
                let excess = rate * (cell.vapor - w_max);
                cell.droplets += excess;
                cell.vapor -= excess;
            }
        });
}

pub fn half_and_half_pass(lattice: &mut Lattice) {
    let width = lattice.width();
    let midline = width / 2;
    lattice
        .cells_mut()
        .par_chunks_mut(width)
        .for_each(|row| {
            for (x, cell) in row.iter_mut().enumerate() {
                cell.droplets = if x > midline { 1.0 } else { 0.0 };
            }
        });
}
