//! Uncompressed DIB frame encoding

use super::{Frame, FrameEncoder};
use crate::{Error, Result, VideoCodec};
use byteorder::{ByteOrder, LittleEndian};
use image::codecs::bmp::BmpEncoder;
use image::{ExtendedColorType, RgbImage};

/// Offset of `bfOffBits` in a BMP file header
const BF_OFF_BITS: usize = 10;

/// Encodes frames as 24-bit bottom-up BGR pixel data
#[derive(Debug, Default)]
pub struct DibEncoder {
    last_size: usize,
}

impl DibEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameEncoder for DibEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        let rgb = frame.to_rgb_image()?;
        let data = rgb_to_dib(&rgb, self.last_size)?;
        self.last_size = data.len();
        Ok(data)
    }

    fn codec(&self) -> VideoCodec {
        VideoCodec::Dib
    }
}

/// Convert an RGB image to DIB pixel data.
///
/// The image is written as a BMP file and everything before the pixel data
/// offset is discarded. `size_hint` is the expected pixel data length, used
/// only to size the buffer.
pub fn rgb_to_dib(img: &RgbImage, size_hint: usize) -> Result<Vec<u8>> {
    let mut bmp = Vec::with_capacity(size_hint + 54);
    BmpEncoder::new(&mut bmp).encode(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgb8,
    )?;

    let header = bmp
        .get(BF_OFF_BITS..BF_OFF_BITS + 4)
        .ok_or_else(|| Error::InvalidInput("BMP output too short".to_string()))?;
    let start = LittleEndian::read_u32(header) as usize;
    if start > bmp.len() {
        return Err(Error::InvalidInput(format!(
            "BMP pixel offset {} past end of {} bytes",
            start,
            bmp.len()
        )));
    }

    Ok(bmp.split_off(start))
}
