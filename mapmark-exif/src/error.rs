//! Errors raised by the EXIF codec.

use mapmark_core::CoordinateError;
use thiserror::Error;

/// Coordinate axis named in range errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// North/south axis, valid within `[-90, 90]`.
    Latitude,
    /// East/west axis, valid within `[-180, 180]`.
    Longitude,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        })
    }
}

/// Errors returned while reading or writing EXIF GPS data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExifError {
    /// The bytes are not a JPEG, or its EXIF structure is corrupt.
    #[error("invalid image format: {reason}")]
    InvalidImageFormat {
        /// What was wrong with the input.
        reason: String,
    },
    /// A GPS coordinate could not be decoded.
    #[error("malformed GPS coordinate")]
    MalformedCoordinate {
        /// Underlying decoding failure.
        #[from]
        source: CoordinateError,
    },
    /// The position to write lies outside the valid range.
    #[error("{axis} {value} is out of range")]
    CoordinateOutOfRange {
        /// Axis of the rejected value.
        axis: Axis,
        /// The rejected value.
        value: f64,
    },
    /// The encoded EXIF payload does not fit in one JPEG segment.
    #[error("EXIF payload of {size} bytes exceeds the JPEG segment limit")]
    SegmentTooLarge {
        /// Encoded segment length in bytes.
        size: usize,
    },
    /// A data URL did not carry valid base64.
    #[error("invalid base64 image data")]
    DataUrl {
        /// Decoder failure.
        #[source]
        source: base64::DecodeError,
    },
}

impl ExifError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidImageFormat {
            reason: reason.into(),
        }
    }
}
