//! `idx1` index accumulation

use super::riff::{FourCc, RiffWriter};
use crate::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Seek, Write};

/// Index flag marking a keyframe
pub const AVIIF_KEYFRAME: u32 = 0x10;

/// One `idx1` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub chunk_id: FourCc,
    pub flags: u32,
    /// Offset of the chunk header relative to the `movi` fourcc
    pub offset: u32,
    /// Declared (unpadded) chunk size
    pub size: u32,
}

impl IndexEntry {
    pub fn is_keyframe(&self) -> bool {
        self.flags & AVIIF_KEYFRAME != 0
    }
}

/// Entries in the order their chunks were written
#[derive(Debug, Default)]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the `idx1` chunk, consuming the index
    pub fn write_chunk<W: Write + Seek>(self, riff: &mut RiffWriter<W>) -> Result<u32> {
        let chunk = riff.open_chunk(FourCc::IDX1)?;
        for entry in &self.entries {
            riff.write_all(&entry.chunk_id.0)?;
            riff.write_u32::<LittleEndian>(entry.flags)?;
            riff.write_u32::<LittleEndian>(entry.offset)?;
            riff.write_u32::<LittleEndian>(entry.size)?;
        }
        riff.close_chunk(chunk)
    }
}
