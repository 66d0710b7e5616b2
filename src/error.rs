//! Error types for avimux

use crate::VideoCodec;
use thiserror::Error;

/// Result type alias for avimux operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for avimux operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Codec is not available in this build
    #[error("Codec {0:?} unavailable: no encoder in this build")]
    CodecUnavailable(VideoCodec),

    /// Frame dimensions can only be set once
    #[error("Dimensions have already been set to {width}x{height}")]
    DimensionsAlreadySet { width: u32, height: u32 },

    /// Audio was written to a session opened without an audio stream
    #[error("No audio stream configured")]
    NoAudioStream,

    /// The writer has already been closed
    #[error("AVI writer is closed")]
    Closed,

    /// A raw frame differs in byte size from the first one written
    #[error("Frame data size is not consistent: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },

    /// A frame differs in dimensions from the established ones
    #[error("Frame dimensions are not consistent: expected {expected:?}, got {actual:?}")]
    FrameDimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Audio format differs from the established one
    #[error("Audio format mismatch: {0}")]
    AudioFormatMismatch(String),

    /// Close was called before the frame rate was set
    #[error("Must set frames/second before closing")]
    MissingFrameRate,

    /// Close was called before the sample rate was established
    #[error("Must set samples/second before closing")]
    MissingSampleRate,

    /// JPEG data without the JFIF marker at its usual offset
    #[error("JFIF header not found in jpeg data")]
    MissingJfifMarker,

    /// A RIFF chunk was closed out of order
    #[error("Chunk nesting error: {0}")]
    ChunkNesting(String),

    /// A size, offset or header field does not fit the 32-bit fields of the format
    #[error("Value exceeds the range of the AVI header fields")]
    TooLarge,

    /// An earlier write failed part way; the output is incomplete
    #[error("A previous write failed; the AVI output is incomplete")]
    WriteFailed,

    /// Reading from a PCM source stream failed
    #[error("PCM source read failed: {0}")]
    PcmSource(#[source] std::io::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Broad classes of failure, used by callers to decide what to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse; fix the configuration and retry
    Configuration,
    /// The written stream is inconsistent; discard the partial output
    StreamConsistency,
    /// The underlying storage failed; fatal for the session
    Storage,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_)
            | Error::CodecUnavailable(_)
            | Error::DimensionsAlreadySet { .. }
            | Error::NoAudioStream => ErrorKind::Configuration,
            Error::Closed
            | Error::FrameSizeMismatch { .. }
            | Error::FrameDimensionMismatch { .. }
            | Error::AudioFormatMismatch(_)
            | Error::MissingFrameRate
            | Error::MissingSampleRate
            | Error::MissingJfifMarker
            | Error::ChunkNesting(_)
            | Error::TooLarge
            | Error::WriteFailed
            | Error::PcmSource(_) => ErrorKind::StreamConsistency,
            Error::Io(_) => ErrorKind::Storage,
            Error::Image(image::ImageError::IoError(_)) => ErrorKind::Storage,
            Error::Image(_) => ErrorKind::StreamConsistency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::InvalidInput("x".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(Error::Closed.kind(), ErrorKind::StreamConsistency);
        assert_eq!(
            Error::FrameSizeMismatch {
                expected: 4,
                actual: 8
            }
            .kind(),
            ErrorKind::StreamConsistency
        );

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(Error::from(io).kind(), ErrorKind::Storage);

        // a failing input stream is not a storage failure
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated");
        assert_eq!(
            Error::PcmSource(source).kind(),
            ErrorKind::StreamConsistency
        );
        assert_eq!(Error::WriteFailed.kind(), ErrorKind::StreamConsistency);
    }
}
