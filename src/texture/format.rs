//! Binary format definitions for droplet snapshot files.

use std::io::{self, Read, Write};

/// Magic bytes identifying a droplet snapshot file.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"CLDT";

/// Current format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// What each stored frame contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum SnapshotLayout {
    /// Every cell's droplets.
    #[default]
    Volume = 0,
    /// Droplets summed down each column.
    ColumnDensity = 1,
}

impl SnapshotLayout {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(SnapshotLayout::Volume),
            1 => Some(SnapshotLayout::ColumnDensity),
            _ => None,
        }
    }
}

/// File header for droplet snapshot files.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotHeader {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layout: SnapshotLayout,
    /// Total number of frames.
    pub frame_count: u64,
}

impl SnapshotHeader {
    /// Size of header in bytes.
    /// Magic(4) + Version(2) + Layout(2) + Width(4) + Height(4) + Depth(4) +
    /// FrameCount(8) + Reserved(4) = 32
    pub const SIZE: usize = 32;

    /// Number of f32 values in one frame.
    pub fn frame_len(&self) -> usize {
        let columns = self.width as usize * self.height as usize;
        match self.layout {
            SnapshotLayout::Volume => columns * self.depth as usize,
            SnapshotLayout::ColumnDensity => columns,
        }
    }

    /// Size of one frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.frame_len() * 4
    }

    /// Write header to output.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(SNAPSHOT_MAGIC)?;
        w.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        w.write_all(&(self.layout as u16).to_le_bytes())?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&self.depth.to_le_bytes())?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        // Reserved bytes
        w.write_all(&[0u8; 4])?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid CLDT magic bytes",
            ));
        }

        let mut buf2 = [0u8; 2];
        let mut buf4 = [0u8; 4];
        let mut buf8 = [0u8; 8];

        r.read_exact(&mut buf2)?;
        let version = u16::from_le_bytes(buf2);
        if version != SNAPSHOT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported CLDT version: {}", version),
            ));
        }

        r.read_exact(&mut buf2)?;
        let raw_layout = u16::from_le_bytes(buf2);
        let layout = SnapshotLayout::from_u16(raw_layout).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unknown CLDT layout: {}", raw_layout),
            )
        })?;

        r.read_exact(&mut buf4)?;
        let width = u32::from_le_bytes(buf4);

        r.read_exact(&mut buf4)?;
        let height = u32::from_le_bytes(buf4);

        r.read_exact(&mut buf4)?;
        let depth = u32::from_le_bytes(buf4);

        r.read_exact(&mut buf8)?;
        let frame_count = u64::from_le_bytes(buf8);

        // Skip reserved bytes
        r.read_exact(&mut buf4)?;

        Ok(Self {
            width,
            height,
            depth,
            layout,
            frame_count,
        })
    }
}

/// Encode f32 values to little-endian bytes, appending to `out`.
pub fn encode_frame(values: impl IntoIterator<Item = f32>, out: &mut Vec<u8>) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Decode little-endian bytes to f32 values.
pub fn decode_frame(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
