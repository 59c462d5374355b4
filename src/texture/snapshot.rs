//! Read-only view of the droplet field.

use crate::compute::Lattice;

/// Borrowed view of every cell's `droplets`, the only field the renderer consumes.
#[derive(Debug, Clone, Copy)]
pub struct DropletSnapshot<'a> {
    lattice: &'a Lattice,
}

impl<'a> DropletSnapshot<'a> {
    pub fn new(lattice: &'a Lattice) -> Self {
        Self { lattice }
    }

    /// Extents as `(width, height, depth)`.
    #[inline]
    pub fn dims(&self) -> (usize, usize, usize) {
        self.lattice.dims()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.lattice.get(x, y, z).droplets
    }

    /// Droplets in lattice order (x fastest, then y, then z).
    pub fn iter(&self) -> impl Iterator<Item = f32> + 'a {
        self.lattice.cells().iter().map(|c| c.droplets)
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.iter().collect()
    }

    /// Sum of droplets down each `(x, y)` column, `y * width + x` indexed.
    pub fn column_density(&self) -> Vec<f32> {
        let (width, height, _) = self.dims();
        let layer = width * height;
        let mut columns = vec![0.0f32; layer];
        for layer_cells in self.lattice.cells().chunks_exact(layer) {
            for (column, cell) in columns.iter_mut().zip(layer_cells) {
                *column += cell.droplets;
            }
        }
        columns
    }

    pub fn max(&self) -> f32 {
        self.iter().fold(f32::NEG_INFINITY, f32::max)
    }
}
