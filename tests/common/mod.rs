//! Common test utilities

#![allow(dead_code)]

use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use std::path::Path;

/// Generate a test image with a solid color and a gradient
pub fn generate_test_image(width: u32, height: u32, base_color: [u8; 4]) -> RgbaImage {
    let mut img = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        // Add subtle gradient to make frames distinguishable
        let r = base_color[0].saturating_add((x % 50) as u8);
        let g = base_color[1].saturating_add((y % 50) as u8);
        let b = base_color[2];
        let a = base_color[3];
        *pixel = Rgba([r, g, b, a]);
    }

    img
}

/// Generate a test frame for the writer
pub fn generate_test_frame(width: u32, height: u32, number: u32) -> avimux::Frame {
    let colors = [
        [255, 100, 100, 255],
        [100, 255, 100, 255],
        [100, 100, 255, 255],
    ];
    let color = colors[(number as usize) % colors.len()];
    let img = generate_test_image(width, height, color);
    avimux::Frame::from_dynamic_image(&DynamicImage::ImageRgba8(img))
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn tag_at(bytes: &[u8], offset: usize) -> [u8; 4] {
    [
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ]
}

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Fields of the `avih` record
#[derive(Debug, Default)]
pub struct MainHeaderInfo {
    pub micro_sec_per_frame: u32,
    pub flags: u32,
    pub total_frames: u32,
    pub streams: u32,
    pub width: u32,
    pub height: u32,
}

/// One `strl` list
#[derive(Debug)]
pub struct StreamInfo {
    pub fcc_type: [u8; 4],
    pub handler: [u8; 4],
    pub scale: u32,
    pub rate: u32,
    pub length: u32,
    pub format: Vec<u8>,
}

impl StreamInfo {
    /// (width, height, bit count, compression) from a BITMAPINFOHEADER
    pub fn bitmap(&self) -> (u32, u32, u16, u32) {
        (
            u32_at(&self.format, 4),
            u32_at(&self.format, 8),
            u16_at(&self.format, 14),
            u32_at(&self.format, 16),
        )
    }

    /// (format tag, channels, sample rate, avg bytes/sec, block align, bits)
    pub fn wave(&self) -> (u16, u16, u32, u32, u16, u16) {
        (
            u16_at(&self.format, 0),
            u16_at(&self.format, 2),
            u32_at(&self.format, 4),
            u32_at(&self.format, 8),
            u16_at(&self.format, 12),
            u16_at(&self.format, 14),
        )
    }
}

/// A chunk inside the `movi` list
#[derive(Debug)]
pub struct DataChunk {
    pub tag: [u8; 4],
    /// Absolute file offset of the chunk tag
    pub offset: usize,
    pub size: u32,
    pub payload: Vec<u8>,
    pub padding: Vec<u8>,
}

/// One `idx1` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    pub tag: [u8; 4],
    pub flags: u32,
    pub offset: u32,
    pub size: u32,
}

/// Independent re-parse of an AVI file
#[derive(Debug, Default)]
pub struct ParsedAvi {
    pub riff_size: u32,
    pub main: MainHeaderInfo,
    pub streams: Vec<StreamInfo>,
    /// Absolute offset of the `movi` fourcc
    pub movi_start: usize,
    pub chunks: Vec<DataChunk>,
    pub index: Vec<IndexRecord>,
}

impl ParsedAvi {
    pub fn chunks_tagged(&self, tag: &[u8; 4]) -> Vec<&DataChunk> {
        self.chunks.iter().filter(|c| &c.tag == tag).collect()
    }
}

/// Parse an AVI file, panicking on anything malformed
pub fn parse_avi(bytes: &[u8]) -> ParsedAvi {
    assert_eq!(&bytes[0..4], b"RIFF", "missing RIFF tag");
    assert_eq!(&bytes[8..12], b"AVI ", "missing AVI subtype");

    let mut avi = ParsedAvi {
        riff_size: u32_at(bytes, 4),
        ..ParsedAvi::default()
    };
    assert_eq!(avi.riff_size as usize, bytes.len() - 8, "RIFF size");

    let mut pos = 12;
    while pos < bytes.len() {
        let tag = tag_at(bytes, pos);
        let size = u32_at(bytes, pos + 4) as usize;
        let body = pos + 8;
        match &tag {
            b"LIST" => match &tag_at(bytes, body) {
                b"hdrl" => parse_hdrl(bytes, body + 4, body + size, &mut avi),
                b"movi" => {
                    avi.movi_start = body;
                    parse_movi(bytes, body + 4, body + size, &mut avi);
                }
                other => panic!("unexpected list {:?}", other),
            },
            b"idx1" => {
                assert_eq!(size % 16, 0, "idx1 size");
                for entry in bytes[body..body + size].chunks(16) {
                    avi.index.push(IndexRecord {
                        tag: tag_at(entry, 0),
                        flags: u32_at(entry, 4),
                        offset: u32_at(entry, 8),
                        size: u32_at(entry, 12),
                    });
                }
            }
            other => panic!("unexpected chunk {:?}", other),
        }
        pos = body + align4(size);
    }

    avi
}

fn parse_hdrl(bytes: &[u8], mut pos: usize, end: usize, avi: &mut ParsedAvi) {
    while pos < end {
        let tag = tag_at(bytes, pos);
        let size = u32_at(bytes, pos + 4) as usize;
        let body = pos + 8;
        match &tag {
            b"avih" => {
                assert_eq!(size, 56, "avih size");
                avi.main = MainHeaderInfo {
                    micro_sec_per_frame: u32_at(bytes, body),
                    flags: u32_at(bytes, body + 12),
                    total_frames: u32_at(bytes, body + 16),
                    streams: u32_at(bytes, body + 24),
                    width: u32_at(bytes, body + 32),
                    height: u32_at(bytes, body + 36),
                };
            }
            b"LIST" => {
                assert_eq!(&tag_at(bytes, body), b"strl");
                avi.streams.push(parse_strl(bytes, body + 4, body + size));
            }
            other => panic!("unexpected header chunk {:?}", other),
        }
        pos = body + align4(size);
    }
    assert_eq!(pos, end, "hdrl children overrun");
}

fn parse_strl(bytes: &[u8], mut pos: usize, end: usize) -> StreamInfo {
    let mut stream = StreamInfo {
        fcc_type: [0; 4],
        handler: [0; 4],
        scale: 0,
        rate: 0,
        length: 0,
        format: Vec::new(),
    };
    while pos < end {
        let tag = tag_at(bytes, pos);
        let size = u32_at(bytes, pos + 4) as usize;
        let body = pos + 8;
        match &tag {
            b"strh" => {
                assert_eq!(size, 56, "strh size");
                stream.fcc_type = tag_at(bytes, body);
                stream.handler = tag_at(bytes, body + 4);
                stream.scale = u32_at(bytes, body + 20);
                stream.rate = u32_at(bytes, body + 24);
                stream.length = u32_at(bytes, body + 32);
            }
            b"strf" => stream.format = bytes[body..body + size].to_vec(),
            other => panic!("unexpected stream chunk {:?}", other),
        }
        pos = body + align4(size);
    }
    stream
}

fn parse_movi(bytes: &[u8], mut pos: usize, end: usize, avi: &mut ParsedAvi) {
    while pos < end {
        let size = u32_at(bytes, pos + 4) as usize;
        let body = pos + 8;
        avi.chunks.push(DataChunk {
            tag: tag_at(bytes, pos),
            offset: pos,
            size: size as u32,
            payload: bytes[body..body + size].to_vec(),
            padding: bytes[body + size..body + align4(size)].to_vec(),
        });
        pos = body + align4(size);
    }
    assert_eq!(pos, end, "movi children overrun");
}

/// Read and parse an AVI file from disk
pub fn parse_avi_file<P: AsRef<Path>>(path: P) -> ParsedAvi {
    let bytes = std::fs::read(path).unwrap();
    parse_avi(&bytes)
}

/// Save a test image as JPEG
#[cfg(feature = "mjpeg")]
pub fn save_jpeg<P: AsRef<Path>>(img: &RgbaImage, path: P, quality: u8) -> std::io::Result<()> {
    // Convert RGBA to RGB for JPEG
    let rgb_img: image::RgbImage = DynamicImage::ImageRgba8(img.clone()).to_rgb8();

    let file = std::fs::File::create(path)?;
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, quality);
    encoder
        .encode_image(&rgb_img)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    Ok(())
}
