//! Texture hand-off between the simulator and its rendering collaborator.
//!
//! When a physics cycle reaches [`Stage::Texture`](crate::compute::Stage::Texture) the
//! simulator hands a read-only [`DropletSnapshot`] to a [`TextureSink`]. The sink decides
//! when the stage is finished.
//!
//! # File Format
//!
//! [`SnapshotRecorder`] stores finished frames in `.cldt` (cloud droplet texture) files:
//!
//! ```text
//! Header (32 bytes):
//!   Magic: "CLDT" (4 bytes)
//!   Version: u16
//!   Layout: u16 (0 = full volume, 1 = column density)
//!   Width: u32
//!   Height: u32
//!   Depth: u32
//!   Frame count: u64
//!   Reserved: 4 bytes
//!
//! Frame data:
//!   Each frame is width * height * depth (volume) or width * height (column)
//!   little-endian f32 values
//! ```

mod format;
mod recorder;
mod snapshot;

pub use format::{SNAPSHOT_MAGIC, SNAPSHOT_VERSION, SnapshotHeader, SnapshotLayout};
pub use recorder::{SnapshotReader, SnapshotRecorder};
pub use snapshot::DropletSnapshot;

/// Whether the texture stage may hand control back to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureStatus {
    Done,
    /// Retry on the next frame.
    Pending,
}

/// Consumer of finished droplet fields.
pub trait TextureSink {
    fn present(&mut self, snapshot: &DropletSnapshot<'_>) -> TextureStatus;
}

/// Sink that accepts every frame immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TextureSink for NullSink {
    fn present(&mut self, _snapshot: &DropletSnapshot<'_>) -> TextureStatus {
        TextureStatus::Done
    }
}

impl<F> TextureSink for F
where
    F: FnMut(&DropletSnapshot<'_>) -> TextureStatus,
{
    fn present(&mut self, snapshot: &DropletSnapshot<'_>) -> TextureStatus {
        self(snapshot)
    }
}
