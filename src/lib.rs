//! Cloud Lattice - Incremental cloud formation on a 3D cellular lattice.
//!
//! Every cell carries a velocity, water vapor, condensed droplets and a pair of
//! advection accumulators. A fixed pipeline of stencil passes (velocity update,
//! vapor diffusion, two-phase advection, phase transition) sweeps the lattice one
//! cell at a time, paced so a whole cycle fits the configured run period no matter
//! the host frame rate. Finished droplet fields are handed to a texture sink.
//!
//! # Architecture
//!
//! - `schema`: Configuration and seeding types
//! - `compute`: Lattice storage, kernels, scheduler and the stage state machine
//! - `texture`: Droplet snapshots, texture sinks and the `.cldt` recorder
//!
//! # Example
//!
//! ```rust,no_run
//! use cloud_lattice::{
//!     compute::CloudSimulator,
//!     schema::{Seed, SimulationConfig},
//!     texture::{DropletSnapshot, TextureStatus},
//! };
//!
//! let config = SimulationConfig::default();
//! let mut sim = CloudSimulator::with_seed(config, &Seed::default()).unwrap();
//!
//! let mut frames = Vec::new();
//! let mut sink = |snapshot: &DropletSnapshot<'_>| {
//!     frames.push(snapshot.column_density());
//!     TextureStatus::Done
//! };
//! for _ in 0..600 {
//!     sim.advance_with(1.0 / 60.0, &mut sink);
//! }
//!
//! println!("{} textures after {} cycles", frames.len(), sim.cycles_completed());
//! ```

pub mod compute;
pub mod schema;
pub mod texture;

// Re-export commonly used types
pub use compute::{CloudSimulator, Lattice, LatticeStats, Stage};
pub use schema::{Pattern, Seed, SimMode, SimulationConfig};
pub use texture::{DropletSnapshot, TextureSink, TextureStatus};
