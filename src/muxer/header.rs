//! Fixed-layout AVI header records
//!
//! Each record is written twice: zero-filled when the file is opened, and
//! with its final values once the totals are known. [`Placeholder`] pairs the
//! reserved offset with the record type so the second write is a single,
//! consuming call.

use super::riff::{FourCc, RiffWriter};
use crate::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Seek, Write};
use std::marker::PhantomData;

/// `avih` flag: the file has an `idx1` chunk
pub const AVIF_HASINDEX: u32 = 0x10;

/// `biCompression` value for uncompressed RGB
pub const BI_RGB: u32 = 0;

/// `wFormatTag` value for linear PCM
pub const WAVE_FORMAT_PCM: u16 = 1;

/// A binary record with a fixed serialized length
pub trait Record {
    /// Serialized length in bytes
    const SIZE: usize;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()>;

    fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        self.write_to(&mut buf)?;
        debug_assert_eq!(buf.len(), Self::SIZE);
        Ok(buf)
    }
}

/// Space reserved for a record, filled in exactly once
#[must_use = "a placeholder must be filled before the file is closed"]
#[derive(Debug)]
pub struct Placeholder<R> {
    offset: u64,
    _record: PhantomData<R>,
}

impl<R: Record> Placeholder<R> {
    /// Write `R::SIZE` zero bytes at the current position
    pub fn reserve<W: Write + Seek>(riff: &mut RiffWriter<W>) -> Result<Self> {
        let offset = riff.reserve(R::SIZE)?;
        Ok(Self {
            offset,
            _record: PhantomData,
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Overwrite the reserved bytes with the final record
    pub fn fill<W: Write + Seek>(self, riff: &mut RiffWriter<W>, record: &R) -> Result<()> {
        riff.patch(self.offset, &record.to_bytes()?)
    }
}

/// AVIMAINHEADER body (the `avih` chunk payload)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainHeader {
    pub micro_sec_per_frame: u32,
    pub max_bytes_per_sec: u32,
    pub padding_granularity: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub initial_frames: u32,
    pub streams: u32,
    pub suggested_buffer_size: u32,
    pub width: u32,
    pub height: u32,
}

impl Record for MainHeader {
    const SIZE: usize = 56;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.micro_sec_per_frame)?;
        w.write_u32::<LittleEndian>(self.max_bytes_per_sec)?;
        w.write_u32::<LittleEndian>(self.padding_granularity)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        w.write_u32::<LittleEndian>(self.total_frames)?;
        w.write_u32::<LittleEndian>(self.initial_frames)?;
        w.write_u32::<LittleEndian>(self.streams)?;
        w.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        w.write_u32::<LittleEndian>(self.width)?;
        w.write_u32::<LittleEndian>(self.height)?;
        // dwReserved[4]
        w.write_all(&[0u8; 16])
    }
}

/// AVISTREAMHEADER body (the `strh` chunk payload)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHeader {
    pub fcc_type: u32,
    pub fcc_handler: u32,
    pub flags: u32,
    pub priority: u16,
    pub language: u16,
    pub initial_frames: u32,
    pub scale: u32,
    pub rate: u32,
    pub start: u32,
    pub length: u32,
    pub suggested_buffer_size: u32,
    pub quality: u32,
    pub sample_size: u32,
    /// rcFrame: left, top, right, bottom
    pub frame: [i16; 4],
}

impl StreamHeader {
    /// Header for the video stream
    pub fn video(handler: FourCc, scale: u32, rate: u32, frames: u32) -> Self {
        Self {
            fcc_type: FourCc::VIDS.as_u32(),
            fcc_handler: handler.as_u32(),
            scale,
            rate,
            length: frames,
            quality: u32::MAX,
            ..Self::default()
        }
    }

    /// Header for the PCM audio stream
    pub fn audio(sample_rate: u32, samples: u32) -> Self {
        Self {
            fcc_type: FourCc::AUDS.as_u32(),
            scale: 1,
            rate: sample_rate,
            length: samples,
            quality: u32::MAX,
            ..Self::default()
        }
    }
}

impl Record for StreamHeader {
    const SIZE: usize = 56;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.fcc_type)?;
        w.write_u32::<LittleEndian>(self.fcc_handler)?;
        w.write_u32::<LittleEndian>(self.flags)?;
        w.write_u16::<LittleEndian>(self.priority)?;
        w.write_u16::<LittleEndian>(self.language)?;
        w.write_u32::<LittleEndian>(self.initial_frames)?;
        w.write_u32::<LittleEndian>(self.scale)?;
        w.write_u32::<LittleEndian>(self.rate)?;
        w.write_u32::<LittleEndian>(self.start)?;
        w.write_u32::<LittleEndian>(self.length)?;
        w.write_u32::<LittleEndian>(self.suggested_buffer_size)?;
        w.write_u32::<LittleEndian>(self.quality)?;
        w.write_u32::<LittleEndian>(self.sample_size)?;
        for v in self.frame {
            w.write_i16::<LittleEndian>(v)?;
        }
        Ok(())
    }
}

/// BITMAPINFOHEADER (video `strf` payload)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapInfoHeader {
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

impl BitmapInfoHeader {
    /// 24-bit bottom-up bitmap with the given compression.
    ///
    /// Fails with [`Error::TooLarge`] if a dimension does not fit the signed
    /// header fields.
    pub fn rgb24(width: u32, height: u32, compression: u32) -> Result<Self> {
        let signed = |v: u32| i32::try_from(v).map_err(|_| Error::TooLarge);
        Ok(Self {
            width: signed(width)?,
            height: signed(height)?,
            planes: 1,
            bit_count: 24,
            compression,
            size_image: 0,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            clr_used: 0,
            clr_important: 0,
        })
    }
}

impl Record for BitmapInfoHeader {
    const SIZE: usize = 40;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        // biSize
        w.write_u32::<LittleEndian>(Self::SIZE as u32)?;
        w.write_i32::<LittleEndian>(self.width)?;
        w.write_i32::<LittleEndian>(self.height)?;
        w.write_u16::<LittleEndian>(self.planes)?;
        w.write_u16::<LittleEndian>(self.bit_count)?;
        w.write_u32::<LittleEndian>(self.compression)?;
        w.write_u32::<LittleEndian>(self.size_image)?;
        w.write_i32::<LittleEndian>(self.x_pels_per_meter)?;
        w.write_i32::<LittleEndian>(self.y_pels_per_meter)?;
        w.write_u32::<LittleEndian>(self.clr_used)?;
        w.write_u32::<LittleEndian>(self.clr_important)
    }
}

/// PCMWAVEFORMAT (audio `strf` payload).
///
/// Written without the trailing `cbSize` of WAVEFORMATEX, which PCM does not
/// use, so the record stays 4-byte aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl WaveFormat {
    pub fn pcm(channels: u16, sample_rate: u32, bits_per_sample: u16) -> Result<Self> {
        let block_align = channels
            .checked_mul(bits_per_sample / 8)
            .ok_or(Error::TooLarge)?;
        let avg_bytes_per_sec = u32::from(block_align)
            .checked_mul(sample_rate)
            .ok_or(Error::TooLarge)?;
        Ok(Self {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            samples_per_sec: sample_rate,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
        })
    }
}

impl Record for WaveFormat {
    const SIZE: usize = 16;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.format_tag)?;
        w.write_u16::<LittleEndian>(self.channels)?;
        w.write_u32::<LittleEndian>(self.samples_per_sec)?;
        w.write_u32::<LittleEndian>(self.avg_bytes_per_sec)?;
        w.write_u16::<LittleEndian>(self.block_align)?;
        w.write_u16::<LittleEndian>(self.bits_per_sample)
    }
}

/// Microseconds per frame for a `num/den` frames-per-second rate, rounded
/// to the nearest integer
pub fn micro_sec_per_frame(num: u32, den: u32) -> Result<u32> {
    if num == 0 {
        return Err(Error::InvalidInput(
            "frames/sec must be greater than 0".to_string(),
        ));
    }
    let num = u64::from(num);
    let micros = (1_000_000 * u64::from(den) + num / 2) / num;
    u32::try_from(micros).map_err(|_| Error::TooLarge)
}
