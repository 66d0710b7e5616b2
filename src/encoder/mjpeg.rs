//! Motion-JPEG frame encoding
//!
//! An MJPG AVI frame is a baseline JPEG whose APP0 identifier reads `AVI1`
//! instead of `JFIF`.

use crate::{Error, Result};

/// Byte offset of the APP0 identifier: SOI (2) + APP0 marker (2) + length (2)
const APP0_ID_OFFSET: usize = 6;

/// Rewrite the `JFIF` identifier of JPEG data to `AVI1`, in place.
///
/// Fails if `JFIF` is not at the expected offset; no other location is tried.
pub fn jpeg_to_mjpeg(data: &mut [u8]) -> Result<()> {
    let id = data
        .get_mut(APP0_ID_OFFSET..APP0_ID_OFFSET + 4)
        .ok_or(Error::MissingJfifMarker)?;
    if &id[..] != b"JFIF" {
        return Err(Error::MissingJfifMarker);
    }
    id.copy_from_slice(b"AVI1");
    Ok(())
}

#[cfg(feature = "mjpeg")]
pub use self::jpeg::{rgb_to_mjpeg, MjpegEncoder};

#[cfg(feature = "mjpeg")]
mod jpeg {
    use super::jpeg_to_mjpeg;
    use crate::encoder::{Frame, FrameEncoder};
    use crate::{Result, VideoCodec};
    use image::codecs::jpeg::JpegEncoder;
    use image::RgbImage;

    /// Encodes frames as MJPG payloads
    #[derive(Debug)]
    pub struct MjpegEncoder {
        quality: u8,
    }

    impl MjpegEncoder {
        pub fn new(quality: u8) -> Self {
            Self { quality }
        }
    }

    impl FrameEncoder for MjpegEncoder {
        fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>> {
            let rgb = frame.to_rgb_image()?;
            rgb_to_mjpeg(&rgb, self.quality)
        }

        fn codec(&self) -> VideoCodec {
            VideoCodec::Mjpg
        }
    }

    /// Encode an RGB image as JPEG and tag it for an MJPG AVI
    pub fn rgb_to_mjpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let mut jpg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpg, quality).encode_image(img)?;
        jpeg_to_mjpeg(&mut jpg)?;
        Ok(jpg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jfif_replaced() {
        let mut data = vec![
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01,
        ];
        jpeg_to_mjpeg(&mut data).unwrap();
        assert_eq!(&data[6..10], b"AVI1");
        assert_eq!(&data[0..6], &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
    }

    #[test]
    fn test_missing_jfif_fails() {
        // Exif APP1 instead of JFIF APP0
        let mut data = vec![
            0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10, b'E', b'x', b'i', b'f', 0x00, 0x00,
        ];
        let before = data.clone();
        assert!(matches!(
            jpeg_to_mjpeg(&mut data),
            Err(Error::MissingJfifMarker)
        ));
        assert_eq!(data, before);
    }

    #[test]
    fn test_short_data_fails() {
        let mut data = vec![0xFF, 0xD8, 0xFF];
        assert!(matches!(
            jpeg_to_mjpeg(&mut data),
            Err(Error::MissingJfifMarker)
        ));
    }

    #[cfg(feature = "mjpeg")]
    #[test]
    fn test_encoded_frame_tagged() {
        use crate::encoder::{Frame, FrameEncoder};

        let frame = Frame {
            width: 16,
            height: 16,
            data: vec![200; 16 * 16 * 4],
        };
        let data = MjpegEncoder::new(85).encode(&frame).unwrap();
        assert_eq!(&data[0..2], &[0xFF, 0xD8]);
        assert_eq!(&data[6..10], b"AVI1");
    }
}
