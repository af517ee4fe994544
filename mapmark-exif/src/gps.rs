//! Reading and writing the GPS position of a JPEG.

use log::{debug, warn};
use mapmark_core::{
    GpsPosition, GpsReference, Rational, RationalGpsValue, from_rational, to_rational,
};

use crate::error::Axis;
use crate::jpeg::{JpegSegments, app1_segment};
use crate::tag::{
    GPS_LATITUDE, GPS_LATITUDE_REF, GPS_LONGITUDE, GPS_LONGITUDE_REF, GPS_VERSION_ID,
};
use crate::tiff::{Endian, Entry, ExifBlock, Ifd};
use crate::ExifError;

/// `GPSVersionID` written into a newly created GPS IFD.
const GPS_VERSION: [u8; 4] = [2, 2, 0, 0];

/// Decode the EXIF block of a JPEG.
///
/// Returns `Ok(None)` when the image has no EXIF segment.
///
/// # Errors
/// Returns [`ExifError::InvalidImageFormat`] when `jpeg` is not a JPEG or its
/// EXIF structure is corrupt.
pub fn read_exif(jpeg: &[u8]) -> Result<Option<ExifBlock>, ExifError> {
    let segments = JpegSegments::parse(jpeg)?;
    segments
        .exif_payload(jpeg)
        .map(ExifBlock::parse)
        .transpose()
}

/// Read the GPS position stored in a JPEG.
///
/// Returns `Ok(None)` when there is no EXIF segment, no GPS IFD, or the
/// latitude or longitude entry is absent or not three rationals. A missing
/// reference tag is read as north or east.
///
/// # Errors
/// Returns [`ExifError::InvalidImageFormat`] for non-JPEG or corrupt input and
/// [`ExifError::MalformedCoordinate`] when a rational has a zero denominator.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), mapmark_exif::ExifError> {
/// let jpeg = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9];
/// assert_eq!(mapmark_exif::read_gps(&jpeg)?, None);
/// # Ok(())
/// # }
/// ```
pub fn read_gps(jpeg: &[u8]) -> Result<Option<GpsPosition>, ExifError> {
    let Some(block) = read_exif(jpeg)? else {
        return Ok(None);
    };
    let Some(gps) = block.gps.as_ref() else {
        return Ok(None);
    };
    let endian = block.endian();
    let (Some(latitude), Some(longitude)) = (
        dms_value(gps, GPS_LATITUDE, endian),
        dms_value(gps, GPS_LONGITUDE, endian),
    ) else {
        debug!("GPS IFD lacks a usable latitude/longitude pair");
        return Ok(None);
    };
    let latitude_ref = reference(gps, GPS_LATITUDE_REF, GpsReference::North);
    let longitude_ref = reference(gps, GPS_LONGITUDE_REF, GpsReference::East);
    Ok(Some(GpsPosition::new(
        from_rational(latitude, latitude_ref)?,
        from_rational(longitude, longitude_ref)?,
    )))
}

fn dms_value(gps: &Ifd, tag: u16, endian: Endian) -> Option<RationalGpsValue> {
    let terms: [Rational; 3] = gps.get(tag)?.as_rationals(endian)?.try_into().ok()?;
    Some(RationalGpsValue::from_terms(terms))
}

fn reference(gps: &Ifd, tag: u16, default: GpsReference) -> GpsReference {
    match gps.get(tag).and_then(Entry::first_ascii) {
        None => default,
        Some(letter) => GpsReference::from_ascii(letter).unwrap_or_else(|| {
            warn!("unrecognised GPS reference {letter:#04x}; assuming {default:?}");
            default
        }),
    }
}

/// Write a GPS position into a JPEG, returning the new image bytes.
///
/// Every byte outside the EXIF segment is kept. Inside it, only the four
/// position tags change, a new GPS IFD also gains `GPSVersionID`, and the
/// thumbnail is dropped. Images without EXIF get a fresh big-endian block.
///
/// # Errors
/// Returns [`ExifError::CoordinateOutOfRange`] for a non-finite or
/// out-of-range position, [`ExifError::InvalidImageFormat`] for non-JPEG or
/// corrupt input, and [`ExifError::SegmentTooLarge`] when the re-encoded
/// EXIF no longer fits in a segment.
pub fn write_gps(jpeg: &[u8], latitude: f64, longitude: f64) -> Result<Vec<u8>, ExifError> {
    check_range(Axis::Latitude, latitude, 90.0)?;
    check_range(Axis::Longitude, longitude, 180.0)?;

    let segments = JpegSegments::parse(jpeg)?;
    let mut block = match segments.exif_payload(jpeg) {
        Some(tiff) => ExifBlock::parse(tiff)?,
        None => ExifBlock::new(Endian::Big),
    };
    let endian = block.endian();
    let gps = block.gps.get_or_insert_with(|| {
        let mut ifd = Ifd::new();
        ifd.insert(Entry::byte_values(GPS_VERSION_ID, &GPS_VERSION));
        ifd
    });
    let latitude_ref = GpsReference::for_latitude(latitude);
    let longitude_ref = GpsReference::for_longitude(longitude);
    gps.insert(Entry::ascii(GPS_LATITUDE_REF, &[latitude_ref.as_ascii()]));
    gps.insert(Entry::rationals(
        GPS_LATITUDE,
        &to_rational(latitude).terms(),
        endian,
    ));
    gps.insert(Entry::ascii(GPS_LONGITUDE_REF, &[longitude_ref.as_ascii()]));
    gps.insert(Entry::rationals(
        GPS_LONGITUDE,
        &to_rational(longitude).terms(),
        endian,
    ));
    block.thumbnail = None;

    let segment = app1_segment(&block.encode()?)?;
    Ok(segments.splice_exif(jpeg, &segment))
}

fn check_range(axis: Axis, value: f64, limit: f64) -> Result<(), ExifError> {
    if value.is_finite() && (-limit..=limit).contains(&value) {
        Ok(())
    } else {
        Err(ExifError::CoordinateOutOfRange { axis, value })
    }
}
