//! PCM audio format bookkeeping

use crate::{Error, Result};
use std::io::Read;

/// Format of a block of interleaved PCM samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

/// A PCM source that can be drained straight into an audio chunk
#[derive(Debug)]
pub struct PcmStream<R> {
    pub format: PcmFormat,
    pub reader: R,
}

impl<R: Read> PcmStream<R> {
    pub fn new(format: PcmFormat, reader: R) -> Self {
        Self { format, reader }
    }
}

/// The audio format established for a writer session.
///
/// Channel count and bit depth are fixed when the session opens; the sample
/// rate may be set explicitly or adopted from the first [`PcmStream`].
#[derive(Debug, Clone)]
pub struct PcmSettings {
    channels: u16,
    bits_per_sample: u16,
    sample_rate: Option<u32>,
}

impl PcmSettings {
    pub fn new(channels: u16, bits_per_sample: u16) -> Self {
        Self {
            channels,
            bits_per_sample,
            sample_rate: None,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        if rate == 0 {
            return Err(Error::InvalidInput(
                "Samples/second must be greater than 0".to_string(),
            ));
        }
        self.sample_rate = Some(rate);
        Ok(())
    }

    /// Check an incoming format against the established one, adopting its
    /// sample rate if none has been set yet.
    pub fn reconcile(&mut self, format: &PcmFormat) -> Result<()> {
        if format.channels != self.channels {
            return Err(Error::AudioFormatMismatch(format!(
                "expected {} channel(s), got {}",
                self.channels, format.channels
            )));
        }
        if format.bits_per_sample != self.bits_per_sample {
            return Err(Error::AudioFormatMismatch(format!(
                "expected {}-bit samples, got {}-bit",
                self.bits_per_sample, format.bits_per_sample
            )));
        }
        match self.sample_rate {
            None => self.set_sample_rate(format.sample_rate)?,
            Some(rate) if rate != format.sample_rate => {
                return Err(Error::AudioFormatMismatch(format!(
                    "expected {} Hz, got {} Hz",
                    rate, format.sample_rate
                )))
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Sample frames contained in `bytes` of interleaved audio
    pub fn samples_in(&self, bytes: u64) -> f64 {
        bytes as f64 / self.bytes_per_sample() as f64 / self.channels as f64
    }
}
