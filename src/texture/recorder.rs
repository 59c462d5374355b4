//! Snapshot recorder and reader for finished droplet frames.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::format::{SnapshotHeader, SnapshotLayout, decode_frame, encode_frame};
use super::{DropletSnapshot, TextureSink, TextureStatus};

/// Texture sink that appends every presented frame to a `.cldt` file.
///
/// Usage:
/// ```ignore
/// let mut recorder = SnapshotRecorder::create("clouds.cldt", (50, 50, 16), SnapshotLayout::Volume)?;
/// for _ in 0..frames {
///     simulator.advance_with(dt, &mut recorder);
/// }
/// recorder.finalize()?;
/// ```
pub struct SnapshotRecorder {
    writer: BufWriter<File>,
    header: SnapshotHeader,
    /// Pre-allocated buffer for frame encoding.
    encode_buffer: Vec<u8>,
    /// First write failure; later frames are skipped.
    error: Option<io::Error>,
}

impl SnapshotRecorder {
    /// Create a recorder for a lattice of `dims`, writing a placeholder header.
    pub fn create<P: AsRef<Path>>(
        path: P,
        dims: (usize, usize, usize),
        layout: SnapshotLayout,
    ) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = SnapshotHeader {
            width: dims.0 as u32,
            height: dims.1 as u32,
            depth: dims.2 as u32,
            layout,
            frame_count: 0, // Will be updated on finalize
        };
        header.write_to(&mut writer)?;

        let frame_size = header.frame_size();
        Ok(Self {
            writer,
            header,
            encode_buffer: Vec::with_capacity(frame_size),
            error: None,
        })
    }

    /// Append one frame.
    pub fn record(&mut self, snapshot: &DropletSnapshot<'_>) -> io::Result<()> {
        let dims = snapshot.dims();
        let expected = (
            self.header.width as usize,
            self.header.height as usize,
            self.header.depth as usize,
        );
        if dims != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Snapshot dims {:?} do not match recorder header", dims),
            ));
        }

        self.encode_buffer.clear();
        match self.header.layout {
            SnapshotLayout::Volume => encode_frame(snapshot.iter(), &mut self.encode_buffer),
            SnapshotLayout::ColumnDensity => {
                encode_frame(snapshot.column_density(), &mut self.encode_buffer)
            }
        }
        self.writer.write_all(&self.encode_buffer)?;
        self.header.frame_count += 1;
        Ok(())
    }

    /// Get number of frames recorded so far.
    pub fn frames_written(&self) -> u64 {
        self.header.frame_count
    }

    /// Rewrite the header with the final frame count and flush.
    ///
    /// Reports the first error hit while recording, if any.
    pub fn finalize(mut self) -> io::Result<u64> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.writer)?;
        self.writer.flush()?;
        Ok(self.header.frame_count)
    }
}

impl TextureSink for SnapshotRecorder {
    fn present(&mut self, snapshot: &DropletSnapshot<'_>) -> TextureStatus {
        if self.error.is_none()
            && let Err(err) = self.record(snapshot)
        {
            log::error!("snapshot recording failed: {}", err);
            self.error = Some(err);
        }
        // Recording failures never stall the pipeline.
        TextureStatus::Done
    }
}

/// Reader for `.cldt` files.
pub struct SnapshotReader {
    reader: BufReader<File>,
    header: SnapshotHeader,
}

impl SnapshotReader {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let header = SnapshotHeader::read_from(&mut reader)?;
        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    pub fn frame_count(&self) -> u64 {
        self.header.frame_count
    }

    /// Read a specific frame by index.
    pub fn read_frame(&mut self, frame_index: u64) -> io::Result<Vec<f32>> {
        if frame_index >= self.header.frame_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Frame index {} out of range ({} frames)",
                    frame_index, self.header.frame_count
                ),
            ));
        }

        let frame_size = self.header.frame_size() as u64;
        let offset = SnapshotHeader::SIZE as u64 + frame_index * frame_size;
        self.reader.seek(SeekFrom::Start(offset))?;

        let mut data = vec![0u8; frame_size as usize];
        self.reader.read_exact(&mut data)?;
        Ok(decode_frame(&data))
    }
}
