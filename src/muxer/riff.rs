//! RIFF chunk framing
//!
//! A chunk is written as a fourcc tag followed by a little-endian u32 length.
//! The length is unknown when the chunk starts, so [`RiffWriter::open_chunk`]
//! reserves it and [`RiffWriter::close_chunk`] seeks back to fill it in.
//!
//! Open chunks are tracked on a stack. A [`Chunk`] handle can only be made by
//! opening and is consumed by closing, so a chunk cannot be closed twice; the
//! stack rejects closing anything but the innermost open chunk.

use crate::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;
use std::io::{self, Seek, SeekFrom, Write};

/// Four character code identifying a chunk type or codec
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: FourCc = FourCc(*b"RIFF");
    pub const LIST: FourCc = FourCc(*b"LIST");
    pub const AVI: FourCc = FourCc(*b"AVI ");
    pub const HDRL: FourCc = FourCc(*b"hdrl");
    pub const AVIH: FourCc = FourCc(*b"avih");
    pub const STRL: FourCc = FourCc(*b"strl");
    pub const STRH: FourCc = FourCc(*b"strh");
    pub const STRF: FourCc = FourCc(*b"strf");
    pub const MOVI: FourCc = FourCc(*b"movi");
    pub const IDX1: FourCc = FourCc(*b"idx1");
    pub const VIDS: FourCc = FourCc(*b"vids");
    pub const AUDS: FourCc = FourCc(*b"auds");
    pub const VIDEO_DATA: FourCc = FourCc(*b"00db");
    pub const AUDIO_DATA: FourCc = FourCc(*b"01wb");
    pub const MJPG: FourCc = FourCc(*b"MJPG");
    pub const DIB: FourCc = FourCc(*b"DIB ");

    /// The fourcc as a little-endian u32, the way it sits in a DWORD field
    pub fn as_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// Handle to an open chunk whose length field has not been written yet
#[must_use = "an open chunk must be closed with RiffWriter::close_chunk"]
#[derive(Debug)]
pub struct Chunk {
    tag: FourCc,
    size_offset: u64,
}

impl Chunk {
    pub fn tag(&self) -> FourCc {
        self.tag
    }

    /// File offset of the reserved length field
    pub fn size_offset(&self) -> u64 {
        self.size_offset
    }

    /// File offset where the chunk payload begins (just past the length field)
    pub fn data_offset(&self) -> u64 {
        self.size_offset + 4
    }
}

/// Random-access writer that frames RIFF chunks and back-patches lengths.
///
/// Offsets are absolute positions in the underlying output. Alignment is
/// measured from the position the writer started at, so a RIFF stream
/// embedded at an odd offset is still padded correctly.
pub struct RiffWriter<W: Write + Seek> {
    inner: W,
    start: u64,
    position: u64,
    open: Vec<u64>,
}

impl<W: Write + Seek> RiffWriter<W> {
    pub fn new(mut inner: W) -> Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self {
            inner,
            start: position,
            position,
            open: Vec::new(),
        })
    }

    /// Current write offset
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Offset the writer started at
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Number of chunks currently open
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Start a plain chunk: tag plus a zeroed length field
    pub fn open_chunk(&mut self, tag: FourCc) -> Result<Chunk> {
        self.write_all(&tag.0)?;
        let size_offset = self.position;
        self.write_u32::<LittleEndian>(0)?;
        self.open.push(size_offset);
        Ok(Chunk { tag, size_offset })
    }

    /// Start a list chunk (`RIFF` or `LIST`) carrying a subtype tag
    pub fn open_list(&mut self, tag: FourCc, subtype: FourCc) -> Result<Chunk> {
        let chunk = self.open_chunk(tag)?;
        self.write_all(&subtype.0)?;
        Ok(chunk)
    }

    /// Finish a chunk, writing its length and returning it.
    ///
    /// The length covers everything written after the length field, so
    /// padding written before the close is counted and padding written after
    /// is not.
    pub fn close_chunk(&mut self, chunk: Chunk) -> Result<u32> {
        match self.open.last() {
            Some(&top) if top == chunk.size_offset => {}
            Some(_) => {
                return Err(Error::ChunkNesting(format!(
                    "{:?} closed while an inner chunk is still open",
                    chunk.tag
                )))
            }
            None => {
                return Err(Error::ChunkNesting(format!(
                    "{:?} closed with no chunk open",
                    chunk.tag
                )))
            }
        }

        let size = self.position - chunk.data_offset();
        let size = u32::try_from(size).map_err(|_| Error::TooLarge)?;
        self.patch(chunk.size_offset, &size.to_le_bytes())?;
        self.open.pop();
        Ok(size)
    }

    /// Write zero bytes until the distance from the start is a multiple of 4
    pub fn pad(&mut self) -> Result<()> {
        let remainder = (4 - (self.position - self.start) % 4) % 4;
        if remainder > 0 {
            self.write_all(&[0u8; 4][..remainder as usize])?;
        }
        Ok(())
    }

    /// Reserve `len` zero bytes at the current position, returning their offset
    pub fn reserve(&mut self, len: usize) -> Result<u64> {
        let offset = self.position;
        self.write_all(&vec![0u8; len])?;
        Ok(offset)
    }

    /// Overwrite earlier bytes, then return to the write position
    pub fn patch(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        if offset + bytes.len() as u64 > self.position {
            return Err(Error::InvalidInput(format!(
                "patch at {offset} runs past the written region"
            )));
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(bytes)?;
        self.inner.seek(SeekFrom::Start(self.position))?;
        Ok(())
    }

    /// Release the underlying output. Fails if any chunk is still open.
    pub fn into_inner(mut self) -> Result<W> {
        if !self.open.is_empty() {
            return Err(Error::ChunkNesting(format!(
                "{} chunk(s) still open",
                self.open.len()
            )));
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
impl<W: Write + Seek> RiffWriter<W> {
    /// Move the tracked position without writing, to reach offsets near the
    /// 32-bit limits
    pub(crate) fn skip_unwritten(&mut self, len: u64) {
        self.position += len;
    }
}

impl<W: Write + Seek> Write for RiffWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
