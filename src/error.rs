//! Error types for encoding, decoding, and the file wrapper.
//!
//! [`EncodeError`] and [`DecodeError`] cover the `INVALID_ARGUMENT` and
//! `OUT_OF_MEMORY` taxa; [`QoiError`] additionally folds in `std::io::Error`
//! for the `IO_ERROR` taxon used by [`crate::file`].

use std::fmt::{self, Display};

/// Errors that may occur while encoding a pixel buffer into a QOI stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// The descriptor violated a constraint; the string names which one
    /// (zero dimension, bad channel count, bad colorspace, oversized image).
    InvalidDescriptor(&'static str),
    /// The pixel buffer did not hold `width * height * channels` bytes.
    BufferTooSmall { expected: usize, actual: usize },
    /// The output buffer could not be allocated.
    AllocationFailed,
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::InvalidDescriptor(reason) => {
                write!(f, "invalid image descriptor: {reason}")
            }
            EncodeError::BufferTooSmall { expected, actual } => write!(
                f,
                "pixel buffer too small: expected {expected} bytes, got {actual}"
            ),
            EncodeError::AllocationFailed => f.write_str("failed to allocate output buffer"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Errors that may occur while decoding a QOI stream into a pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The stream is shorter than the minimum header + terminator size.
    BufferTooShort { minimum: usize, actual: usize },
    /// The first four bytes were not `"qoif"`.
    InvalidMagic([u8; 4]),
    /// Width or height read from the header is zero.
    InvalidDimensions,
    /// `channels` read from the header was not `3` or `4`.
    InvalidChannels(u8),
    /// `colorspace` read from the header was not `0` or `1`.
    InvalidColorspace(u8),
    /// `width * height` exceeds the implementation pixel cap.
    ImageTooLarge { pixels: u64, cap: u64 },
    /// The requested target channel count was not `0`, `3`, or `4`.
    InvalidTargetChannels(u8),
    /// The opcode stream ended before `width * height` pixels were produced.
    TruncatedStream,
    /// The output buffer could not be allocated.
    AllocationFailed,
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::BufferTooShort { minimum, actual } => write!(
                f,
                "buffer too short to be a QOI stream: need at least {minimum} bytes, got {actual}"
            ),
            DecodeError::InvalidMagic(got) => {
                write!(f, "invalid magic bytes {got:02x?}, expected \"qoif\"")
            }
            DecodeError::InvalidDimensions => {
                f.write_str("header width and height must be non-zero")
            }
            DecodeError::InvalidChannels(c) => {
                write!(f, "invalid channel count {c} in header, expected 3 or 4")
            }
            DecodeError::InvalidColorspace(cs) => {
                write!(f, "invalid colorspace {cs} in header, expected 0 or 1")
            }
            DecodeError::ImageTooLarge { pixels, cap } => {
                write!(f, "image has {pixels} pixels, exceeding the cap of {cap}")
            }
            DecodeError::InvalidTargetChannels(c) => {
                write!(f, "invalid target channel count {c}, expected 0, 3, or 4")
            }
            DecodeError::TruncatedStream => {
                f.write_str("opcode stream ended before all pixels were decoded")
            }
            DecodeError::AllocationFailed => f.write_str("failed to allocate output buffer"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Unifies [`EncodeError`], [`DecodeError`], and file I/O failures for
/// [`crate::file::read`] and [`crate::file::write`].
#[derive(Debug)]
pub enum QoiError {
    Encode(EncodeError),
    Decode(DecodeError),
    Io(std::io::Error),
}

impl Display for QoiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QoiError::Encode(err) => write!(f, "encode error: {err}"),
            QoiError::Decode(err) => write!(f, "decode error: {err}"),
            QoiError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for QoiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QoiError::Encode(err) => Some(err),
            QoiError::Decode(err) => Some(err),
            QoiError::Io(err) => Some(err),
        }
    }
}

impl From<EncodeError> for QoiError {
    fn from(err: EncodeError) -> Self {
        QoiError::Encode(err)
    }
}

impl From<DecodeError> for QoiError {
    fn from(err: DecodeError) -> Self {
        QoiError::Decode(err)
    }
}

impl From<std::io::Error> for QoiError {
    fn from(err: std::io::Error) -> Self {
        QoiError::Io(err)
    }
}
