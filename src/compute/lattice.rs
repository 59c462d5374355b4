//! Lattice store - Dense 3D grid of cloud cells.
//!
//! Cells live in one contiguous buffer indexed `z * height * width + y * width + x`,
//! which is also the order the sweep cursor visits them in.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Axis-aligned neighbour offset `(dx, dy, dz)`.
pub type Offset = (i64, i64, i64);

/// Three-component velocity vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        rhs * self
    }
}

impl Sum for Vec3 {
    fn sum<I: Iterator<Item = Vec3>>(iter: I) -> Vec3 {
        iter.fold(Vec3::ZERO, Add::add)
    }
}

/// Write-side buffer filled by the scatter pass and drained by the gather pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accum {
    pub vapor: f32,
    pub droplets: f32,
}

impl Accum {
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.vapor == 0.0 && self.droplets == 0.0
    }
}

/// State of a single lattice cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub velocity: Vec3,
    pub vapor: f32,
    pub droplets: f32,
    pub accum: Accum,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        velocity: Vec3::ZERO,
        vapor: 0.0,
        droplets: 0.0,
        accum: Accum {
            vapor: 0.0,
            droplets: 0.0,
        },
    };

    /// Water held by this cell (vapor + droplets).
    #[inline]
    pub fn mass(&self) -> f32 {
        self.vapor + self.droplets
    }
}

/// Fixed-extent 3D lattice of cells.
#[derive(Debug, Clone)]
pub struct Lattice {
    cells: Vec<Cell>,
    width: usize,
    height: usize,
    depth: usize,
}

impl Lattice {
    /// Create a zeroed lattice.
    ///
    /// # Panics
    /// If any extent is zero; callers validate through `SimulationConfig` first.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        assert!(
            width > 0 && height > 0 && depth > 0,
            "lattice extents must be non-zero, got {}x{}x{}",
            width,
            height,
            depth
        );
        Self {
            cells: vec![Cell::EMPTY; width * height * depth],
            width,
            height,
            depth,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Extents as `(width, height, depth)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.depth)
    }

    /// Number of cells.
    #[inline]
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.width && y < self.height && z < self.depth
    }

    /// Convert (x, y, z) coordinates to flat index.
    #[inline]
    #[track_caller]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        assert!(
            self.contains(x, y, z),
            "cell ({}, {}, {}) out of bounds for {}x{}x{} lattice",
            x,
            y,
            z,
            self.width,
            self.height,
            self.depth
        );
        z * self.height * self.width + y * self.width + x
    }

    /// Convert a flat index back to (x, y, z).
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize, usize) {
        let slice = self.width * self.height;
        (index % self.width, (index % slice) / self.width, index / slice)
    }

    /// Flat index of the cell at `(x, y, z) + offset`, or `None` outside the lattice.
    #[inline]
    pub fn offset_index(&self, x: usize, y: usize, z: usize, offset: Offset) -> Option<usize> {
        let nx = shift(x, offset.0, self.width)?;
        let ny = shift(y, offset.1, self.height)?;
        let nz = shift(z, offset.2, self.depth)?;
        Some(nz * self.height * self.width + ny * self.width + nx)
    }

    /// Neighbour at `(x, y, z) + offset`, or `None` past the open boundary.
    #[inline]
    pub fn neighbor(&self, x: usize, y: usize, z: usize, offset: Offset) -> Option<&Cell> {
        self.offset_index(x, y, z, offset).map(|i| &self.cells[i])
    }

    #[inline]
    #[track_caller]
    pub fn get(&self, x: usize, y: usize, z: usize) -> &Cell {
        &self.cells[self.index(x, y, z)]
    }

    #[inline]
    #[track_caller]
    pub fn get_mut(&mut self, x: usize, y: usize, z: usize) -> &mut Cell {
        let idx = self.index(x, y, z);
        &mut self.cells[idx]
    }

    #[inline]
    #[track_caller]
    pub fn set(&mut self, x: usize, y: usize, z: usize, cell: Cell) {
        *self.get_mut(x, y, z) = cell;
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Zero every cell.
    pub fn reset(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Add `dose` vapor to every cell of the bottom layer (z = 0).
    pub fn add_vapor_source(&mut self, dose: f32) {
        let layer = self.width * self.height;
        for cell in &mut self.cells[..layer] {
            cell.vapor += dose;
        }
    }

    /// Zero the advection buffers of every cell.
    pub fn clear_accum(&mut self) {
        for cell in &mut self.cells {
            cell.accum = Accum::default();
        }
    }

    pub fn accum_is_clear(&self) -> bool {
        self.cells.iter().all(|c| c.accum.is_zero())
    }

    /// Sum of vapor + droplets over the whole lattice.
    pub fn total_mass(&self) -> f32 {
        self.cells.iter().map(Cell::mass).sum()
    }
}

#[inline]
fn shift(coord: usize, delta: i64, extent: usize) -> Option<usize> {
    let moved = coord as i64 + delta;
    (moved >= 0 && (moved as usize) < extent).then_some(moved as usize)
}

/// Lattice statistics for monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatticeStats {
    pub total_vapor: f32,
    pub total_droplets: f32,
    pub mean_droplets: f32,
    pub max_droplets: f32,
    /// Cells holding more than a trace of water.
    pub active_cells: usize,
}

impl LatticeStats {
    pub fn from_lattice(lattice: &Lattice) -> Self {
        let mut total_vapor = 0.0f32;
        let mut total_droplets = 0.0f32;
        let mut max_droplets = f32::NEG_INFINITY;
        let mut active_cells = 0usize;

        for cell in lattice.cells() {
            total_vapor += cell.vapor;
            total_droplets += cell.droplets;
            max_droplets = max_droplets.max(cell.droplets);
            if cell.mass().abs() > 1e-6 {
                active_cells += 1;
            }
        }

        Self {
            total_vapor,
            total_droplets,
            mean_droplets: total_droplets / lattice.volume() as f32,
            max_droplets,
            active_cells,
        }
    }

    pub fn total_mass(&self) -> f32 {
        self.total_vapor + self.total_droplets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_lattice_is_zeroed() {
        let lattice = Lattice::new(3, 4, 5);
        assert_eq!(lattice.volume(), 60);
        assert_eq!(lattice.dims(), (3, 4, 5));
        assert!(lattice.cells().iter().all(|c| *c == Cell::EMPTY));
    }

    #[test]
    fn test_index_matches_sweep_order() {
        let lattice = Lattice::new(3, 4, 5);
        let mut expected = 0;
        for z in 0..5 {
            for y in 0..4 {
                for x in 0..3 {
                    assert_eq!(lattice.index(x, y, z), expected);
                    assert_eq!(lattice.coords(expected), (x, y, z));
                    expected += 1;
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_range_access_panics() {
        let lattice = Lattice::new(2, 2, 2);
        let _ = lattice.get(0, 2, 0);
    }

    #[test]
    fn test_neighbor_open_boundary() {
        let mut lattice = Lattice::new(2, 2, 2);
        lattice.get_mut(1, 0, 0).vapor = 3.0;

        assert_eq!(lattice.neighbor(0, 0, 0, (1, 0, 0)).map(|c| c.vapor), Some(3.0));
        assert!(lattice.neighbor(0, 0, 0, (-1, 0, 0)).is_none());
        assert!(lattice.neighbor(1, 1, 1, (0, 0, 1)).is_none());
        assert!(lattice.neighbor(1, 0, 1, (1, 0, -1)).is_none());
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut lattice = Lattice::new(2, 3, 2);
        lattice.set(
            1,
            2,
            1,
            Cell {
                velocity: Vec3::new(1.0, 2.0, 3.0),
                vapor: 4.0,
                droplets: 5.0,
                accum: Accum {
                    vapor: 6.0,
                    droplets: 7.0,
                },
            },
        );
        lattice.reset();
        assert!(lattice.cells().iter().all(|c| *c == Cell::EMPTY));
    }

    #[test]
    fn test_vapor_source_only_bottom_layer() {
        let mut lattice = Lattice::new(3, 2, 4);
        lattice.add_vapor_source(0.1);

        for z in 0..4 {
            for y in 0..2 {
                for x in 0..3 {
                    let expected = if z == 0 { 0.1 } else { 0.0 };
                    assert_eq!(lattice.get(x, y, z).vapor, expected);
                }
            }
        }
        assert!((lattice.total_mass() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_clear_accum_keeps_water() {
        let mut lattice = Lattice::new(2, 2, 2);
        let cell = lattice.get_mut(1, 1, 1);
        cell.vapor = 1.0;
        cell.accum.vapor = 2.0;
        assert!(!lattice.accum_is_clear());

        lattice.clear_accum();
        assert!(lattice.accum_is_clear());
        assert_eq!(lattice.get(1, 1, 1).vapor, 1.0);
    }

    #[test]
    fn test_stats() {
        let mut lattice = Lattice::new(2, 2, 1);
        lattice.get_mut(0, 0, 0).droplets = 2.0;
        lattice.get_mut(1, 1, 0).vapor = 1.0;

        let stats = LatticeStats::from_lattice(&lattice);
        assert_eq!(stats.total_droplets, 2.0);
        assert_eq!(stats.total_vapor, 1.0);
        assert_eq!(stats.max_droplets, 2.0);
        assert_eq!(stats.mean_droplets, 0.5);
        assert_eq!(stats.active_cells, 2);
        assert_eq!(stats.total_mass(), 3.0);
    }

    #[test]
    fn test_vec3_ops() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vec3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(2.0 * a, a * 2.0);
        assert_eq!([a, b].into_iter().sum::<Vec3>(), a + b);
    }
}
