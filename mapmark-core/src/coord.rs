//! Conversion between signed decimal degrees and the rational
//! degrees/minutes/seconds triples stored in EXIF GPS tags.
//!
//! The sign of a coordinate never lives in the rational triple. It is carried
//! separately by a [`GpsReference`], matching the `GPSLatitudeRef` and
//! `GPSLongitudeRef` tags.

use std::fmt;

use thiserror::Error;

/// Denominator of the seconds term, giving milli-arc-second precision.
pub const SECONDS_DENOMINATOR: u32 = 1000;

/// Largest error introduced by [`to_rational`], in degrees.
pub const RATIONAL_TOLERANCE: f64 = 1.0 / 3_600_000.0;

const MILLISECONDS_PER_MINUTE: u32 = 60 * SECONDS_DENOMINATOR;

/// An unsigned EXIF `RATIONAL` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator of the fraction.
    pub numerator: u32,
    /// Denominator of the fraction.
    pub denominator: u32,
}

impl Rational {
    /// Construct a rational from its numerator and denominator.
    #[must_use]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Construct a whole-number rational (`value / 1`).
    #[must_use]
    pub const fn whole(value: u32) -> Self {
        Self::new(value, 1)
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "rational terms are evaluated as floating-point fractions"
    )]
    fn to_f64(self, term: DmsTerm) -> Result<f64, CoordinateError> {
        if self.denominator == 0 {
            return Err(CoordinateError::MalformedCoordinate { term });
        }
        Ok(f64::from(self.numerator) / f64::from(self.denominator))
    }
}

/// Identifies one term of a degrees/minutes/seconds triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmsTerm {
    /// The degrees term.
    Degrees,
    /// The minutes term.
    Minutes,
    /// The seconds term.
    Seconds,
}

impl fmt::Display for DmsTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Degrees => "degrees",
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
        };
        f.write_str(label)
    }
}

/// A coordinate magnitude stored as three EXIF rationals.
///
/// Degrees and minutes use a denominator of one; seconds use
/// [`SECONDS_DENOMINATOR`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RationalGpsValue {
    /// Whole degrees.
    pub degrees: Rational,
    /// Whole minutes.
    pub minutes: Rational,
    /// Seconds in thousandths.
    pub seconds: Rational,
}

impl RationalGpsValue {
    /// Build a value from the three terms in tag order.
    #[must_use]
    pub const fn from_terms(terms: [Rational; 3]) -> Self {
        let [degrees, minutes, seconds] = terms;
        Self {
            degrees,
            minutes,
            seconds,
        }
    }

    /// Return the three terms in tag order.
    #[must_use]
    pub const fn terms(&self) -> [Rational; 3] {
        [self.degrees, self.minutes, self.seconds]
    }
}

/// Hemisphere reference paired with a [`RationalGpsValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpsReference {
    /// Northern latitude (`N`).
    North,
    /// Southern latitude (`S`).
    South,
    /// Eastern longitude (`E`).
    East,
    /// Western longitude (`W`).
    West,
}

impl GpsReference {
    /// Reference for a signed latitude. Zero maps to north.
    #[must_use]
    pub fn for_latitude(latitude: f64) -> Self {
        if latitude < 0.0 {
            Self::South
        } else {
            Self::North
        }
    }

    /// Reference for a signed longitude. Zero maps to east.
    #[must_use]
    pub fn for_longitude(longitude: f64) -> Self {
        if longitude < 0.0 {
            Self::West
        } else {
            Self::East
        }
    }

    /// Parse the ASCII reference letter stored in EXIF.
    #[must_use]
    pub const fn from_ascii(letter: u8) -> Option<Self> {
        match letter {
            b'N' => Some(Self::North),
            b'S' => Some(Self::South),
            b'E' => Some(Self::East),
            b'W' => Some(Self::West),
            _ => None,
        }
    }

    /// ASCII letter stored in EXIF for this reference.
    #[must_use]
    pub const fn as_ascii(self) -> u8 {
        match self {
            Self::North => b'N',
            Self::South => b'S',
            Self::East => b'E',
            Self::West => b'W',
        }
    }

    /// Whether coordinates with this reference are negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::South | Self::West)
    }
}

/// A photo position in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPosition {
    /// Latitude, positive north.
    pub latitude: f64,
    /// Longitude, positive east.
    pub longitude: f64,
}

impl GpsPosition {
    /// Construct a position from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Errors raised when decoding rational coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// A term of the triple has a zero denominator.
    #[error("malformed coordinate: {term} term has a zero denominator")]
    MalformedCoordinate {
        /// The offending term.
        term: DmsTerm,
    },
}

/// Convert a decimal degree magnitude into a rational DMS triple.
///
/// Only the magnitude is encoded; pair the result with
/// [`GpsReference::for_latitude`] or [`GpsReference::for_longitude`]. Seconds
/// are rounded to the nearest thousandth, and a rounded value of sixty
/// seconds carries into the minutes term.
///
/// # Examples
///
/// ```
/// use mapmark_core::coord::{Rational, to_rational};
///
/// let value = to_rational(45.5);
/// assert_eq!(value.degrees, Rational::whole(45));
/// assert_eq!(value.minutes, Rational::whole(30));
/// assert_eq!(value.seconds, Rational::new(0, 1000));
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "DMS decomposition is floating-point maths"
)]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "floored and rounded magnitudes are non-negative and saturate on overflow"
)]
#[must_use]
pub fn to_rational(degrees: f64) -> RationalGpsValue {
    let magnitude = degrees.abs();
    let minutes_float = magnitude.fract() * 60.0;
    let seconds_float = minutes_float.fract() * 60.0;

    let mut whole_degrees = magnitude.floor() as u32;
    let mut whole_minutes = minutes_float.floor() as u32;
    let mut milliseconds = (seconds_float * f64::from(SECONDS_DENOMINATOR)).round() as u32;

    if milliseconds >= MILLISECONDS_PER_MINUTE {
        milliseconds -= MILLISECONDS_PER_MINUTE;
        whole_minutes = whole_minutes.saturating_add(1);
    }
    if whole_minutes >= 60 {
        whole_minutes -= 60;
        whole_degrees = whole_degrees.saturating_add(1);
    }

    RationalGpsValue {
        degrees: Rational::whole(whole_degrees),
        minutes: Rational::whole(whole_minutes),
        seconds: Rational::new(milliseconds, SECONDS_DENOMINATOR),
    }
}

/// Convert a rational DMS triple and its reference back to signed degrees.
///
/// # Errors
/// Returns [`CoordinateError::MalformedCoordinate`] when any term has a zero
/// denominator.
///
/// # Examples
///
/// ```
/// use mapmark_core::coord::{GpsReference, Rational, RationalGpsValue, from_rational};
///
/// # fn main() -> Result<(), mapmark_core::coord::CoordinateError> {
/// let value = RationalGpsValue::from_terms([
///     Rational::whole(93),
///     Rational::whole(15),
///     Rational::new(0, 1000),
/// ]);
/// let longitude = from_rational(value, GpsReference::West)?;
/// assert!((longitude + 93.25).abs() < 1e-12);
/// # Ok(())
/// # }
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "DMS recombination is floating-point maths"
)]
pub fn from_rational(
    value: RationalGpsValue,
    reference: GpsReference,
) -> Result<f64, CoordinateError> {
    let degrees = value.degrees.to_f64(DmsTerm::Degrees)?;
    let minutes = value.minutes.to_f64(DmsTerm::Minutes)?;
    let seconds = value.seconds.to_f64(DmsTerm::Seconds)?;
    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    Ok(if reference.is_negative() {
        -magnitude
    } else {
        magnitude
    })
}
