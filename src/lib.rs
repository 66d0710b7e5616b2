//! avimux - Streaming AVI writer
//!
//! Writes RIFF AVI files with one video stream, either uncompressed DIB or
//! motion-JPEG, and an optional linear PCM audio stream. Frames and audio
//! blocks are appended as they arrive; header totals and the `idx1` index are
//! filled in when the writer is closed.
//!
//! ```no_run
//! use avimux::{AviWriter, WriterOptions};
//!
//! let mut avi = AviWriter::create("out.avi", WriterOptions::default())?;
//! avi.set_frame_rate(15, 1)?;
//! avi.write_frame_data(&vec![0u8; 320 * 240 * 3])?;
//! avi.close()?;
//! # Ok::<(), avimux::Error>(())
//! ```

pub mod encoder;
pub mod error;
pub mod muxer;

pub use encoder::pcm::{PcmFormat, PcmStream};
pub use encoder::Frame;
pub use error::{Error, ErrorKind, Result};
pub use muxer::{AviWriter, FourCc};

use muxer::header::BI_RGB;

/// Video codec types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// Uncompressed 24-bit device independent bitmap
    Dib,
    /// Motion-JPEG
    Mjpg,
}

impl VideoCodec {
    /// Stream handler fourcc written to `strh`
    pub fn fourcc(&self) -> FourCc {
        match self {
            VideoCodec::Dib => FourCc::DIB,
            VideoCodec::Mjpg => FourCc::MJPG,
        }
    }

    /// `biCompression` value written to the bitmap header
    pub fn compression(&self) -> u32 {
        match self {
            VideoCodec::Dib => BI_RGB,
            VideoCodec::Mjpg => FourCc::MJPG.as_u32(),
        }
    }
}

/// Encoders the caller's environment provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// A JPEG encoder is available for MJPG output
    pub jpeg_encoder: bool,
}

impl Capabilities {
    /// Probe what this build can encode
    pub fn detect() -> Self {
        Self {
            jpeg_encoder: cfg!(feature = "mjpeg"),
        }
    }

    pub fn supports(&self, codec: VideoCodec) -> bool {
        match codec {
            VideoCodec::Dib => true,
            VideoCodec::Mjpg => self.jpeg_encoder,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Options fixed when a writer is opened
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Video codec
    pub codec: VideoCodec,
    /// Audio channels: 0 (no audio), 1 or 2
    pub audio_channels: u16,
    /// PCM bit depth of the audio stream
    pub bits_per_sample: u16,
    /// JPEG quality (1-100) for MJPG frames
    pub jpeg_quality: u8,
    /// What the environment can encode
    pub capabilities: Capabilities,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            codec: VideoCodec::Dib,
            audio_channels: 0,
            bits_per_sample: 16,
            jpeg_quality: 85,
            capabilities: Capabilities::detect(),
        }
    }
}

impl WriterOptions {
    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if self.audio_channels > 2 {
            return Err(Error::InvalidInput(format!(
                "Channels must be 0, 1 or 2, got {}",
                self.audio_channels
            )));
        }
        if self.bits_per_sample == 0 || self.bits_per_sample % 8 != 0 {
            return Err(Error::InvalidInput(format!(
                "Bits per sample must be a positive multiple of 8, got {}",
                self.bits_per_sample
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::InvalidInput(format!(
                "JPEG quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if !self.capabilities.supports(self.codec) {
            return Err(Error::CodecUnavailable(self.codec));
        }
        Ok(())
    }
}

/// Check if a codec can be encoded by this build
pub fn available(codec: VideoCodec) -> Result<()> {
    if Capabilities::detect().supports(codec) {
        Ok(())
    } else {
        Err(Error::CodecUnavailable(codec))
    }
}
