//! AVI writer session
//!
//! Layout produced:
//!
//! ```text
//! RIFF 'AVI '
//!   LIST 'hdrl'
//!     avih
//!     LIST 'strl'  strh (vids) + strf (BITMAPINFOHEADER)
//!     LIST 'strl'  strh (auds) + strf (WAVEFORMAT)      only with audio
//!   LIST 'movi'
//!     00db / 01wb chunks, each padded to 4 bytes
//!   idx1
//! ```
//!
//! Header records are zero-filled when the writer opens and rewritten by
//! [`AviWriter::close`] once frame and sample totals are known.

use super::header::{
    micro_sec_per_frame, BitmapInfoHeader, MainHeader, Placeholder, Record, StreamHeader,
    WaveFormat, AVIF_HASINDEX,
};
use super::index::{Index, IndexEntry, AVIIF_KEYFRAME};
use super::riff::{Chunk, FourCc, RiffWriter};
use crate::encoder::pcm::{PcmSettings, PcmStream};
use crate::encoder::{create_encoder, Frame, FrameEncoder};
use crate::{Error, Result, VideoCodec, WriterOptions};
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

struct HeaderSlots {
    avih: Placeholder<MainHeader>,
    video_strh: Placeholder<StreamHeader>,
    video_strf: Placeholder<BitmapInfoHeader>,
    audio: Option<(Placeholder<StreamHeader>, Placeholder<WaveFormat>)>,
}

/// Everything that only exists while the file is open
struct OpenFile<W: Write + Seek> {
    riff: RiffWriter<W>,
    root: Chunk,
    movi: Chunk,
    headers: HeaderSlots,
    index: Index,
}

impl<W: Write + Seek> OpenFile<W> {
    /// Offset of the next chunk relative to the `movi` fourcc
    fn movi_offset(&self) -> Result<u32> {
        u32::try_from(self.riff.position() - self.movi.data_offset()).map_err(|_| Error::TooLarge)
    }

    fn write_chunk(&mut self, tag: FourCc, payload: &[u8], flags: u32) -> Result<()> {
        let offset = self.movi_offset()?;
        let chunk = self.riff.open_chunk(tag)?;
        self.riff.write_all(payload)?;
        let size = self.riff.close_chunk(chunk)?;
        self.riff.pad()?;
        self.record(tag, flags, offset, size);
        Ok(())
    }

    /// Copy `reader` to its end into one chunk. Read failures come back as
    /// [`Error::PcmSource`], write failures as [`Error::Io`].
    fn write_chunk_from<R: Read>(&mut self, tag: FourCc, reader: &mut R) -> Result<u32> {
        let offset = self.movi_offset()?;
        let chunk = self.riff.open_chunk(tag)?;
        let mut buf = [0u8; 8192];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::PcmSource(e)),
            };
            self.riff.write_all(&buf[..n])?;
        }
        let size = self.riff.close_chunk(chunk)?;
        self.riff.pad()?;
        self.record(tag, 0, offset, size);
        Ok(size)
    }

    fn record(&mut self, chunk_id: FourCc, flags: u32, offset: u32, size: u32) {
        trace!(tag = ?chunk_id, offset, size, flags, "wrote data chunk");
        self.index.push(IndexEntry {
            chunk_id,
            flags,
            offset,
            size,
        });
    }
}

/// Final header values, computed before anything is finalized
struct FinalHeaders {
    main: MainHeader,
    video_strh: StreamHeader,
    video_strf: BitmapInfoHeader,
    audio: Option<(StreamHeader, WaveFormat)>,
}

/// Reserve a record inside its own chunk
fn reserve_record<R: Record, W: Write + Seek>(
    riff: &mut RiffWriter<W>,
    tag: FourCc,
) -> Result<Placeholder<R>> {
    let chunk = riff.open_chunk(tag)?;
    let slot = Placeholder::reserve(riff)?;
    riff.close_chunk(chunk)?;
    Ok(slot)
}

/// Streaming AVI writer for DIB or MJPG video with optional PCM audio.
///
/// Frames and audio blocks may be interleaved in any order. Frame rate (and
/// sample rate, when audio is configured) must be known before
/// [`close`](Self::close). After a successful close every call fails with
/// [`Error::Closed`].
///
/// If a chunk write fails part way the output can no longer be framed
/// correctly: every later write and `close` fail with [`Error::WriteFailed`]
/// and the partial output should be discarded.
pub struct AviWriter<W: Write + Seek> {
    file: Option<OpenFile<W>>,
    codec: VideoCodec,
    encoder: Box<dyn FrameEncoder>,
    audio: Option<PcmSettings>,
    dimensions: Option<(u32, u32)>,
    frame_rate: Option<(u32, u32)>,
    frame_count: u32,
    sample_count: f64,
    frame_byte_size: Option<usize>,
    failed: bool,
}

impl AviWriter<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and prepare it for writing
    pub fn create<P: AsRef<Path>>(path: P, options: WriterOptions) -> Result<Self> {
        options.validate()?;
        let file = File::create(path.as_ref()).map_err(Error::Io)?;
        Self::new(BufWriter::new(file), options)
    }
}

impl<W: Write + Seek> AviWriter<W> {
    /// Write placeholder headers to `output` and open the `movi` list
    pub fn new(output: W, options: WriterOptions) -> Result<Self> {
        options.validate()?;
        let encoder = create_encoder(options.codec, &options)?;

        let mut riff = RiffWriter::new(output)?;
        let root = riff.open_list(FourCc::RIFF, FourCc::AVI)?;

        let hdrl = riff.open_list(FourCc::LIST, FourCc::HDRL)?;
        let avih = reserve_record::<MainHeader, _>(&mut riff, FourCc::AVIH)?;

        let strl = riff.open_list(FourCc::LIST, FourCc::STRL)?;
        let video_strh = reserve_record::<StreamHeader, _>(&mut riff, FourCc::STRH)?;
        let video_strf = reserve_record::<BitmapInfoHeader, _>(&mut riff, FourCc::STRF)?;
        riff.close_chunk(strl)?;

        let audio_slots = if options.audio_channels > 0 {
            let strl = riff.open_list(FourCc::LIST, FourCc::STRL)?;
            let strh = reserve_record::<StreamHeader, _>(&mut riff, FourCc::STRH)?;
            let strf = reserve_record::<WaveFormat, _>(&mut riff, FourCc::STRF)?;
            riff.close_chunk(strl)?;
            Some((strh, strf))
        } else {
            None
        };
        riff.close_chunk(hdrl)?;

        let movi = riff.open_list(FourCc::LIST, FourCc::MOVI)?;

        debug!(
            codec = ?options.codec,
            audio_channels = options.audio_channels,
            "opened AVI writer"
        );

        let audio = (options.audio_channels > 0)
            .then(|| PcmSettings::new(options.audio_channels, options.bits_per_sample));

        Ok(Self {
            file: Some(OpenFile {
                riff,
                root,
                movi,
                headers: HeaderSlots {
                    avih,
                    video_strh,
                    video_strf,
                    audio: audio_slots,
                },
                index: Index::new(),
            }),
            codec: options.codec,
            encoder,
            audio,
            dimensions: None,
            frame_rate: None,
            frame_count: 0,
            sample_count: 0.0,
            frame_byte_size: None,
            failed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.file.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> Result<()> {
        self.ensure_open()?;
        if self.failed {
            return Err(Error::WriteFailed);
        }
        Ok(())
    }

    /// Run a write against the open file, marking the session failed if it
    /// errors
    fn with_file<T>(&mut self, op: impl FnOnce(&mut OpenFile<W>) -> Result<T>) -> Result<T> {
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        let result = op(file);
        if let Err(e) = &result {
            warn!(error = %e, "chunk write failed; AVI output is incomplete");
            self.failed = true;
        }
        result
    }

    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Whether an earlier write failed and left the output unusable
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Frames per second as `num / den`
    pub fn set_frame_rate(&mut self, num: u32, den: u32) -> Result<()> {
        self.ensure_open()?;
        if num == 0 || den == 0 {
            return Err(Error::InvalidInput(
                "frames/sec must be greater than 0".to_string(),
            ));
        }
        self.frame_rate = Some((num, den));
        Ok(())
    }

    pub fn frame_rate(&self) -> Option<(u32, u32)> {
        self.frame_rate
    }

    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        self.ensure_open()?;
        self.audio
            .as_mut()
            .ok_or(Error::NoAudioStream)?
            .set_sample_rate(rate)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.audio.as_ref().and_then(PcmSettings::sample_rate)
    }

    /// Fix the frame dimensions. They can only be set once, either here or
    /// by the first [`write_frame`](Self::write_frame).
    pub fn set_dimensions(&mut self, width: u32, height: u32) -> Result<()> {
        self.ensure_open()?;
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(
                "Dimensions must be greater than 0".to_string(),
            ));
        }
        if let Some((width, height)) = self.dimensions {
            return Err(Error::DimensionsAlreadySet { width, height });
        }
        self.dimensions = Some((width, height));
        Ok(())
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Number of video frames written so far
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Number of audio sample frames written so far
    pub fn sample_count(&self) -> f64 {
        self.sample_count
    }

    /// Encode a frame with the session's codec and write it
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.ensure_writable()?;
        if let Some(expected) = self.dimensions {
            if expected != frame.dimensions() {
                return Err(Error::FrameDimensionMismatch {
                    expected,
                    actual: frame.dimensions(),
                });
            }
        }

        let payload = self.encoder.encode(frame)?;
        self.write_video_payload(&payload)?;
        self.dimensions.get_or_insert(frame.dimensions());
        Ok(())
    }

    /// Write an already-encoded frame: DIB pixel data, or JPEG data whose
    /// `JFIF` identifier has been replaced by `AVI1`.
    pub fn write_frame_data(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.write_video_payload(data)
    }

    fn write_video_payload(&mut self, payload: &[u8]) -> Result<()> {
        if self.codec == VideoCodec::Dib {
            if let Some(expected) = self.frame_byte_size {
                if expected != payload.len() {
                    return Err(Error::FrameSizeMismatch {
                        expected,
                        actual: payload.len(),
                    });
                }
            }
        }
        let frame_count = self.frame_count.checked_add(1).ok_or(Error::TooLarge)?;

        // only the first frame is marked as a keyframe
        let flags = if self.frame_count == 0 {
            AVIIF_KEYFRAME
        } else {
            0
        };

        self.with_file(|file| file.write_chunk(FourCc::VIDEO_DATA, payload, flags))?;

        if self.codec == VideoCodec::Dib {
            self.frame_byte_size.get_or_insert(payload.len());
        }
        self.frame_count = frame_count;
        Ok(())
    }

    /// Write one block of interleaved PCM audio in the session's format
    pub fn write_audio(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        let samples = self
            .audio
            .as_ref()
            .ok_or(Error::NoAudioStream)?
            .samples_in(data.len() as u64);

        self.with_file(|file| file.write_chunk(FourCc::AUDIO_DATA, data, 0))?;
        self.sample_count += samples;
        Ok(())
    }

    /// Drain a PCM stream into a single audio chunk.
    ///
    /// The stream's format must match the session's channel count and bit
    /// depth; its sample rate is adopted if none has been set.
    pub fn write_audio_stream<R: Read>(&mut self, stream: PcmStream<R>) -> Result<()> {
        self.ensure_writable()?;
        self.audio
            .as_mut()
            .ok_or(Error::NoAudioStream)?
            .reconcile(&stream.format)?;

        let mut reader = stream.reader;
        let size = self.with_file(|file| file.write_chunk_from(FourCc::AUDIO_DATA, &mut reader))?;
        if let Some(settings) = &self.audio {
            self.sample_count += settings.samples_in(u64::from(size));
        }
        Ok(())
    }

    /// Header values for the current totals. Fails on a missing rate or a
    /// value the header fields cannot hold.
    fn final_headers(&self) -> Result<FinalHeaders> {
        let (num, den) = self.frame_rate.ok_or(Error::MissingFrameRate)?;
        let audio = match &self.audio {
            Some(settings) => {
                let rate = settings.sample_rate().ok_or(Error::MissingSampleRate)?;
                let samples = self.sample_count.trunc();
                if samples > f64::from(u32::MAX) {
                    return Err(Error::TooLarge);
                }
                let wave = WaveFormat::pcm(settings.channels(), rate, settings.bits_per_sample())?;
                Some((StreamHeader::audio(rate, samples as u32), wave))
            }
            None => None,
        };

        let (width, height) = self.dimensions.unwrap_or((0, 0));
        Ok(FinalHeaders {
            main: MainHeader {
                micro_sec_per_frame: micro_sec_per_frame(num, den)?,
                flags: AVIF_HASINDEX,
                total_frames: self.frame_count,
                streams: if audio.is_some() { 2 } else { 1 },
                width,
                height,
                ..MainHeader::default()
            },
            video_strh: StreamHeader::video(self.codec.fourcc(), den, num, self.frame_count),
            video_strf: BitmapInfoHeader::rgb24(width, height, self.codec.compression())?,
            audio,
        })
    }

    /// Write the index, fill in the headers and hand back the output.
    ///
    /// Fails without closing anything if the frame rate, or the sample rate
    /// of a configured audio stream, is unknown, or if a total does not fit
    /// its header field.
    pub fn close(&mut self) -> Result<W> {
        self.ensure_writable()?;
        let records = self.final_headers()?;

        let OpenFile {
            mut riff,
            root,
            movi,
            headers,
            index,
        } = self.file.take().ok_or(Error::Closed)?;

        riff.close_chunk(movi)?;
        let index_entries = index.len();
        index.write_chunk(&mut riff)?;
        riff.close_chunk(root)?;

        let streams = records.main.streams;
        headers.avih.fill(&mut riff, &records.main)?;
        headers.video_strh.fill(&mut riff, &records.video_strh)?;
        headers.video_strf.fill(&mut riff, &records.video_strf)?;
        if let (Some((strh, strf)), Some((audio_strh, wave))) = (headers.audio, records.audio) {
            strh.fill(&mut riff, &audio_strh)?;
            strf.fill(&mut riff, &wave)?;
        }

        let output = riff.into_inner()?;
        debug!(
            frames = self.frame_count,
            samples = self.sample_count,
            index_entries,
            streams,
            "closed AVI writer"
        );
        Ok(output)
    }
}

impl<W: Write + Seek> Drop for AviWriter<W> {
    fn drop(&mut self) {
        if self.file.is_some() {
            warn!(
                frames = self.frame_count,
                "AVI writer dropped without close; output is incomplete"
            );
        }
    }
}
