//! Compute module - Lattice storage, stencil kernels and the frame-driven stage machine.

mod batch;
mod cursor;
mod engine;
mod kernels;
mod lattice;
mod saturation;
mod scheduler;
mod stage;

pub use batch::*;
pub use cursor::*;
pub use engine::*;
pub use kernels::*;
pub use lattice::*;
pub use saturation::*;
pub use scheduler::*;
pub use stage::*;
