//! Resumable sweep cursor over the lattice.
//!
//! Turns the `for z { for y { for x {} } }` nest into single steps so a sweep can be
//! spread across any number of frames.

use serde::{Deserialize, Serialize};

/// Result of advancing the cursor by one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// More cells remain in the current sweep.
    InProgress,
    /// The last cell was just visited; the cursor is back at the origin.
    Complete,
}

/// Next cell to process, plus the number of cells visited since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepCursor {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub step_count: u64,
}

impl SweepCursor {
    /// Cursor at `(0, 0, 0)` with no visits.
    pub fn origin() -> Self {
        Self::default()
    }

    /// Return to the origin and forget visits.
    pub fn reset(&mut self) {
        *self = Self::origin();
    }

    /// Step past the current cell in x-fastest order.
    ///
    /// Rolls x into y and y into z; a z rollover resets the cursor and reports `Complete`.
    pub fn advance(&mut self, dims: (usize, usize, usize)) -> Sweep {
        let (width, height, depth) = dims;
        self.step_count += 1;

        self.x += 1;
        if self.x < width {
            return Sweep::InProgress;
        }
        self.x = 0;

        self.y += 1;
        if self.y < height {
            return Sweep::InProgress;
        }
        self.y = 0;

        self.z += 1;
        if self.z < depth {
            return Sweep::InProgress;
        }

        self.reset();
        Sweep::Complete
    }

    /// Position as a flat lattice index.
    #[inline]
    pub fn linear_index(&self, dims: (usize, usize, usize)) -> usize {
        let (width, height, _) = dims;
        self.z * height * width + self.y * width + self.x
    }

    #[inline]
    pub fn is_within(&self, dims: (usize, usize, usize)) -> bool {
        self.x < dims.0 && self.y < dims.1 && self.z < dims.2
    }
}
