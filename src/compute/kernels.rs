//! Per-cell stencil kernels.
//!
//! Every kernel updates the cell at `(x, y, z)` in place from itself and a fixed set of
//! neighbour offsets. Neighbours past the lattice edge contribute zero.

use crate::schema::{AtmosphereConfig, Coefficients, SimulationConfig, StencilShape};

use super::{Lattice, Offset, Stage, Vec3, layer_temperature, saturation_capacity};

/// Cell directly below.
pub const Z_MINUS: Offset = (0, 0, -1);
/// Upstream pressure neighbour of the velocity stencil.
pub const X_MINUS_Z_PLUS: Offset = (-1, 0, 1);
/// Downstream pressure neighbour of the velocity stencil.
pub const X_PLUS_Z_MINUS: Offset = (1, 0, -1);

/// The six axis-aligned neighbours.
pub const AXIS_NEIGHBOURS: [Offset; 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

const ONE_SIDED: [Offset; 1] = [Z_MINUS];

/// Corners of the unit cube a scattered value is split across.
const SCATTER_CORNERS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (0, 1, 0),
    (1, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (0, 1, 1),
    (1, 1, 1),
];

impl StencilShape {
    /// Offsets summed by the relaxation term `K * (sum - 6 * centre)`.
    pub fn relaxation_offsets(self) -> &'static [Offset] {
        match self {
            StencilShape::OneSided => &ONE_SIDED,
            StencilShape::SixNeighbour => &AXIS_NEIGHBOURS,
        }
    }
}

/// Run the kernel of `stage` on one cell.
///
/// # Panics
/// On [`Stage::Texture`], which has no lattice kernel.
pub fn apply_stage_cell(
    stage: Stage,
    lattice: &mut Lattice,
    x: usize,
    y: usize,
    z: usize,
    config: &SimulationConfig,
) {
    match stage {
        Stage::Velocity => velocity_cell(lattice, x, y, z, &config.coefficients),
        Stage::Diffuse => diffuse_cell(lattice, x, y, z, &config.coefficients),
        Stage::AdvectScatter => {
            advect_scatter_cell(lattice, x, y, z);
        }
        Stage::AdvectGather => advect_gather_cell(lattice, x, y, z),
        Stage::Transition => transition_cell(
            lattice,
            x,
            y,
            z,
            config.coefficients.phase_transition_rate,
            &config.atmosphere,
        ),
        Stage::Test => half_and_half_cell(lattice, x, y, z),
        Stage::Texture => panic!("texture stage has no lattice kernel"),
    }
}

/// `v' = v + Kv * (sum(v_n) - 6v) + Kp * (-v(x-1, z+1) - v(x+1, z-1))`.
pub fn velocity_cell(lattice: &mut Lattice, x: usize, y: usize, z: usize, k: &Coefficients) {
    let velocity_at = |offset| {
        lattice
            .neighbor(x, y, z, offset)
            .map_or(Vec3::ZERO, |c| c.velocity)
    };

    let relax: Vec3 = k
        .stencil
        .relaxation_offsets()
        .iter()
        .map(|&o| velocity_at(o))
        .sum();
    let upstream = velocity_at(X_MINUS_Z_PLUS);
    let downstream = velocity_at(X_PLUS_Z_MINUS);

    let cell = lattice.get_mut(x, y, z);
    let v = cell.velocity;
    cell.velocity = v + k.viscosity * (relax - 6.0 * v) + k.pressure * (-upstream - downstream);
}

/// `vapor' = vapor + Kd * (sum(vapor_n) - 6 * vapor)`.
pub fn diffuse_cell(lattice: &mut Lattice, x: usize, y: usize, z: usize, k: &Coefficients) {
    let relax: f32 = k
        .stencil
        .relaxation_offsets()
        .iter()
        .filter_map(|&o| lattice.neighbor(x, y, z, o))
        .map(|c| c.vapor)
        .sum();

    let cell = lattice.get_mut(x, y, z);
    cell.vapor += k.diffusion * (relax - 6.0 * cell.vapor);
}

/// Base corner and trilinear weights of a scatter target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterTarget {
    pub base: (usize, usize, usize),
    pub weights: [f32; 3],
}

impl ScatterTarget {
    /// Share of the scattered value landing on `corner` (each component 0 or 1).
    #[inline]
    pub fn corner_weight(&self, corner: (usize, usize, usize)) -> f32 {
        let axis = |w: f32, bit: usize| if bit == 1 { w } else { 1.0 - w };
        axis(self.weights[0], corner.0)
            * axis(self.weights[1], corner.1)
            * axis(self.weights[2], corner.2)
    }
}

/// Resolve where the contents of `(x, y, z)` land after moving by `velocity`.
///
/// The base corner `floor(p)` must satisfy `0 < l < width - 1` (and likewise on y and
/// z) for the eight-cell footprint to be accepted. Non-finite velocities never qualify.
pub fn scatter_target(
    dims: (usize, usize, usize),
    x: usize,
    y: usize,
    z: usize,
    velocity: Vec3,
) -> Option<ScatterTarget> {
    let axis = |coord: usize, v: f32, extent: usize| -> Option<(usize, f32)> {
        let p = coord as f32 + v;
        if !p.is_finite() {
            return None;
        }
        let floor = p.floor();
        let base = floor as i64;
        (base > 0 && base < extent as i64 - 1).then_some((base as usize, p - floor))
    };

    let (l, wx) = axis(x, velocity.x, dims.0)?;
    let (m, wy) = axis(y, velocity.y, dims.1)?;
    let (n, wz) = axis(z, velocity.z, dims.2)?;
    Some(ScatterTarget {
        base: (l, m, n),
        weights: [wx, wy, wz],
    })
}

/// Move the cell's vapor and droplets into the accum buffers around its displaced position.
///
/// The cell's own water is always taken; when the target is rejected it is dropped.
/// Returns `true` if the water was scattered.
pub fn advect_scatter_cell(lattice: &mut Lattice, x: usize, y: usize, z: usize) -> bool {
    let dims = lattice.dims();
    let cell = lattice.get_mut(x, y, z);
    let (vapor, droplets, velocity) = (cell.vapor, cell.droplets, cell.velocity);
    cell.vapor = 0.0;
    cell.droplets = 0.0;

    let Some(target) = scatter_target(dims, x, y, z, velocity) else {
        return false;
    };

    let (l, m, n) = target.base;
    for corner in SCATTER_CORNERS {
        let weight = target.corner_weight(corner);
        let accum = &mut lattice.get_mut(l + corner.0, m + corner.1, n + corner.2).accum;
        accum.vapor += vapor * weight;
        accum.droplets += droplets * weight;
    }
    true
}

/// Scatter into an external accum buffer instead of the lattice's own.
///
/// `accum` is indexed like the lattice and holds `[vapor, droplets]` pairs. Used by the
/// parallel batch path, where every worker owns a private buffer.
#[allow(clippy::too_many_arguments)]
pub(crate) fn scatter_into(
    dims: (usize, usize, usize),
    x: usize,
    y: usize,
    z: usize,
    vapor: f32,
    droplets: f32,
    velocity: Vec3,
    accum: &mut [[f32; 2]],
) -> bool {
    let Some(target) = scatter_target(dims, x, y, z, velocity) else {
        return false;
    };

    let (width, height, _) = dims;
    let (l, m, n) = target.base;
    for corner in SCATTER_CORNERS {
        let weight = target.corner_weight(corner);
        let idx = (n + corner.2) * height * width + (m + corner.1) * width + (l + corner.0);
        accum[idx][0] += vapor * weight;
        accum[idx][1] += droplets * weight;
    }
    true
}

/// Fold the cell's accum buffer into its water and clear it.
pub fn advect_gather_cell(lattice: &mut Lattice, x: usize, y: usize, z: usize) {
    let cell = lattice.get_mut(x, y, z);
    cell.vapor += cell.accum.vapor;
    cell.droplets += cell.accum.droplets;
    cell.accum = Default::default();
}

/// Relax vapor and droplets around the layer's saturation capacity.
///
/// `droplets' = droplets + a * (vapor - w_max)`, `vapor' = vapor - a * (vapor - w_max)`.
pub fn transition_cell(
    lattice: &mut Lattice,
    x: usize,
    y: usize,
    z: usize,
    rate: f32,
    atmosphere: &AtmosphereConfig,
) {
    let depth = lattice.depth();
    let w_max = saturation_capacity(layer_temperature(z, depth, atmosphere));
    let cell = lattice.get_mut(x, y, z);
    let excess = rate * (cell.vapor - w_max);
    cell.droplets += excess;
    cell.vapor -= excess;
}

/// Diagnostic fill: droplets 1 right of the x midline, 0 elsewhere.
pub fn half_and_half_cell(lattice: &mut Lattice, x: usize, y: usize, z: usize) {
    let midline = lattice.width() / 2;
    lattice.get_mut(x, y, z).droplets = if x > midline { 1.0 } else { 0.0 };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Cell;
    use crate::schema::HeightProfile;

    fn sweep(lattice: &mut Lattice, mut f: impl FnMut(&mut Lattice, usize, usize, usize)) {
        let (w, h, d) = lattice.dims();
        for z in 0..d {
            for y in 0..h {
                for x in 0..w {
                    f(lattice, x, y, z);
                }
            }
        }
    }

    #[test]
    fn test_zero_lattice_is_fixed_point() {
        for stencil in [StencilShape::OneSided, StencilShape::SixNeighbour] {
            let k = Coefficients {
                stencil,
                ..Default::default()
            };
            let mut lattice = Lattice::new(4, 4, 4);
            sweep(&mut lattice, |l, x, y, z| velocity_cell(l, x, y, z, &k));
            sweep(&mut lattice, |l, x, y, z| diffuse_cell(l, x, y, z, &k));
            assert!(lattice.cells().iter().all(|c| *c == Cell::EMPTY));
        }
    }

    #[test]
    fn test_velocity_formula_interior() {
        let k = Coefficients {
            viscosity: 0.01,
            pressure: 0.1,
            ..Default::default()
        };
        let mut lattice = Lattice::new(3, 1, 3);
        lattice.get_mut(1, 0, 1).velocity = Vec3::new(1.0, 0.0, 0.0);
        lattice.get_mut(1, 0, 0).velocity = Vec3::new(0.0, 2.0, 0.0);
        lattice.get_mut(0, 0, 2).velocity = Vec3::new(0.0, 0.0, 3.0);
        lattice.get_mut(2, 0, 0).velocity = Vec3::new(4.0, 0.0, 0.0);

        velocity_cell(&mut lattice, 1, 0, 1, &k);

        let v = Vec3::new(1.0, 0.0, 0.0);
        let expected = v
            + 0.01 * (Vec3::new(0.0, 2.0, 0.0) - 6.0 * v)
            + 0.1 * (-Vec3::new(0.0, 0.0, 3.0) - Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(lattice.get(1, 0, 1).velocity, expected);
    }

    #[test]
    fn test_velocity_edge_neighbours_are_zero() {
        let k = Coefficients::default();
        let mut lattice = Lattice::new(2, 1, 2);
        let v = Vec3::new(1.0, 1.0, 1.0);
        for cell in lattice.cells_mut() {
            cell.velocity = v;
        }

        // every neighbour of (0, 0, 0) the stencil reads lies outside
        velocity_cell(&mut lattice, 0, 0, 0, &k);
        assert_eq!(lattice.get(0, 0, 0).velocity, v + k.viscosity * (-6.0 * v));
    }

    #[test]
    fn test_diffuse_formula() {
        let k = Coefficients::default();
        let mut lattice = Lattice::new(1, 1, 2);
        lattice.get_mut(0, 0, 0).vapor = 1.0;
        lattice.get_mut(0, 0, 1).vapor = 0.5;

        diffuse_cell(&mut lattice, 0, 0, 1, &k);
        assert_eq!(lattice.get(0, 0, 1).vapor, 0.5 + 0.5 * (1.0 - 3.0));

        diffuse_cell(&mut lattice, 0, 0, 0, &k);
        assert_eq!(lattice.get(0, 0, 0).vapor, 1.0 + 0.5 * (0.0 - 6.0));
    }

    #[test]
    fn test_six_neighbour_diffusion_uniform_interior_is_steady() {
        let k = Coefficients {
            diffusion: 0.1,
            stencil: StencilShape::SixNeighbour,
            ..Default::default()
        };
        let mut lattice = Lattice::new(3, 3, 3);
        for cell in lattice.cells_mut() {
            cell.vapor = 0.7;
        }
        diffuse_cell(&mut lattice, 1, 1, 1, &k);
        assert!((lattice.get(1, 1, 1).vapor - 0.7).abs() < 1e-6);

        // a corner is missing three neighbours
        diffuse_cell(&mut lattice, 0, 0, 0, &k);
        assert!((lattice.get(0, 0, 0).vapor - (0.7 + 0.1 * (3.0 * 0.7 - 6.0 * 0.7))).abs() < 1e-6);
    }

    #[test]
    fn test_scatter_target_bounds() {
        let dims = (5, 5, 5);
        // zero velocity at an interior cell lands on itself
        let target = scatter_target(dims, 2, 2, 2, Vec3::ZERO).unwrap();
        assert_eq!(target.base, (2, 2, 2));
        assert_eq!(target.weights, [0.0, 0.0, 0.0]);

        // base must be strictly above 0 and below extent - 1
        assert!(scatter_target(dims, 0, 2, 2, Vec3::ZERO).is_none());
        assert!(scatter_target(dims, 4, 2, 2, Vec3::ZERO).is_none());
        assert!(scatter_target(dims, 3, 2, 2, Vec3::ZERO).is_some());
        assert!(scatter_target(dims, 2, 2, 2, Vec3::new(1.5, 0.0, 0.0)).is_some());
        assert!(scatter_target(dims, 2, 2, 2, Vec3::new(2.5, 0.0, 0.0)).is_none());
        assert!(scatter_target(dims, 2, 2, 2, Vec3::new(f32::NAN, 0.0, 0.0)).is_none());

        let target = scatter_target(dims, 2, 2, 2, Vec3::new(0.25, -0.5, 0.75)).unwrap();
        assert_eq!(target.base, (2, 1, 2));
        assert_eq!(target.weights, [0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_corner_weights_sum_to_one() {
        let target = ScatterTarget {
            base: (1, 1, 1),
            weights: [0.3, 0.6, 0.1],
        };
        let total: f32 = SCATTER_CORNERS.iter().map(|&c| target.corner_weight(c)).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((target.corner_weight((1, 0, 1)) - 0.3 * 0.4 * 0.1).abs() < 1e-7);
    }

    #[test]
    fn test_scatter_then_gather_moves_water() {
        let mut lattice = Lattice::new(5, 5, 5);
        let cell = lattice.get_mut(2, 2, 2);
        cell.vapor = 1.0;
        cell.droplets = 2.0;
        cell.velocity = Vec3::new(0.5, 0.0, 0.0);

        assert!(advect_scatter_cell(&mut lattice, 2, 2, 2));
        assert_eq!(lattice.get(2, 2, 2).vapor, 0.0);
        assert_eq!(lattice.get(2, 2, 2).accum.vapor, 0.5);
        assert_eq!(lattice.get(3, 2, 2).accum.droplets, 1.0);

        sweep(&mut lattice, advect_gather_cell);
        assert!(lattice.accum_is_clear());
        assert_eq!(lattice.get(2, 2, 2).vapor, 0.5);
        assert_eq!(lattice.get(3, 2, 2).droplets, 1.0);
        assert!((lattice.total_mass() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_scatter_out_of_bounds_drops_water() {
        let mut lattice = Lattice::new(5, 5, 5);
        let cell = lattice.get_mut(0, 2, 2);
        cell.vapor = 1.0;

        assert!(!advect_scatter_cell(&mut lattice, 0, 2, 2));
        assert!(lattice.accum_is_clear());
        assert_eq!(lattice.total_mass(), 0.0);
    }

    #[test]
    fn test_scatter_into_matches_lattice_scatter() {
        let dims = (5, 5, 5);
        let velocity = Vec3::new(0.2, 0.4, -0.3);
        let mut lattice = Lattice::new(5, 5, 5);
        let cell = lattice.get_mut(2, 2, 2);
        cell.vapor = 1.5;
        cell.droplets = 0.5;
        cell.velocity = velocity;
        advect_scatter_cell(&mut lattice, 2, 2, 2);

        let mut accum = vec![[0.0f32; 2]; 125];
        assert!(scatter_into(dims, 2, 2, 2, 1.5, 0.5, velocity, &mut accum));
        for (i, cell) in lattice.cells().iter().enumerate() {
            assert_eq!(accum[i], [cell.accum.vapor, cell.accum.droplets]);
        }
    }

    #[test]
    fn test_transition_literal_formula() {
        let atmosphere = AtmosphereConfig::default();
        let mut lattice = Lattice::new(1, 1, 16);
        lattice.get_mut(0, 0, 0).vapor = 30.0;
        lattice.get_mut(0, 0, 0).droplets = 1.0;

        transition_cell(&mut lattice, 0, 0, 0, 0.5, &atmosphere);

        let w_max = saturation_capacity(300.0);
        let cell = lattice.get(0, 0, 0);
        assert_eq!(cell.droplets, 1.0 + 0.5 * (30.0 - w_max));
        assert_eq!(cell.vapor, 30.0 - 0.5 * (30.0 - w_max));
        assert!((cell.mass() - 31.0).abs() < 1e-4);
    }

    #[test]
    fn test_transition_continuous_profile_uses_layer() {
        let atmosphere = AtmosphereConfig {
            height_profile: HeightProfile::Continuous,
            ..Default::default()
        };
        let mut lattice = Lattice::new(1, 1, 16);
        transition_cell(&mut lattice, 0, 0, 8, 1.0, &atmosphere);

        let w_max = saturation_capacity(layer_temperature(8, 16, &atmosphere));
        assert_eq!(lattice.get(0, 0, 8).vapor, w_max);
        assert_eq!(lattice.get(0, 0, 8).droplets, -w_max);
    }

    #[test]
    fn test_half_and_half() {
        let mut lattice = Lattice::new(5, 1, 1);
        lattice.get_mut(0, 0, 0).droplets = 9.0;
        sweep(&mut lattice, half_and_half_cell);
        let droplets: Vec<f32> = lattice.cells().iter().map(|c| c.droplets).collect();
        assert_eq!(droplets, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    #[should_panic(expected = "no lattice kernel")]
    fn test_texture_stage_has_no_kernel() {
        let mut lattice = Lattice::new(1, 1, 1);
        apply_stage_cell(Stage::Texture, &mut lattice, 0, 0, 0, &SimulationConfig::default());
    }
}
