//! Frame and audio encoders
//!
//! Video frames arrive as RGBA pixels and leave as the exact payload an
//! AVI `00db` chunk carries for the session's codec.

pub mod dib;
pub mod mjpeg;
pub mod pcm;

use crate::{Error, Result, VideoCodec, WriterOptions};
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};

/// Raw video frame in RGBA format
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// RGBA pixel data (width * height * 4 bytes)
    pub data: Vec<u8>,
}

impl Frame {
    /// Create from a DynamicImage
    pub fn from_dynamic_image(img: &DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Self {
            width,
            height,
            data,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Drop the alpha channel
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let rgba = RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(
            || {
                Error::InvalidInput(format!(
                    "frame data is {} bytes, expected {} for {}x{} RGBA",
                    self.data.len(),
                    self.width as usize * self.height as usize * 4,
                    self.width,
                    self.height
                ))
            },
        )?;

        Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}

/// Turns frames into `00db` chunk payloads
pub trait FrameEncoder: Send {
    /// Encode one frame
    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>>;

    /// Codec the payloads are tagged with
    fn codec(&self) -> VideoCodec;
}

/// Create an encoder for the specified codec
#[cfg_attr(not(feature = "mjpeg"), allow(unused_variables))]
pub fn create_encoder(codec: VideoCodec, options: &WriterOptions) -> Result<Box<dyn FrameEncoder>> {
    match codec {
        VideoCodec::Dib => Ok(Box::new(dib::DibEncoder::new())),
        #[cfg(feature = "mjpeg")]
        VideoCodec::Mjpg => Ok(Box::new(mjpeg::MjpegEncoder::new(options.jpeg_quality))),
        #[cfg(not(feature = "mjpeg"))]
        VideoCodec::Mjpg => Err(Error::CodecUnavailable(VideoCodec::Mjpg)),
    }
}
