//! Decoder for the `.shp` main file.
//!
//! The file header and record headers are big-endian; record contents are
//! little-endian. Bounding boxes and any Z or M arrays are skipped, so every
//! decoded geometry is two-dimensional.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point};
use thiserror::Error;

use super::rings::assemble_polygons;

const FILE_CODE: i32 = 9994;
const VERSION: i32 = 1000;
const HEADER_LEN: usize = 100;
const RECORD_HEADER_LEN: usize = 8;
const BOX_LEN: usize = 32;
const POINT_LEN: usize = 16;

/// Errors raised while decoding a `.shp` file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShpError {
    /// The file is shorter than its 100-byte header.
    #[error("shape file header is truncated")]
    TruncatedHeader,
    /// The header does not start with file code 9994.
    #[error("bad shape file code {0}")]
    BadFileCode(i32),
    /// The header declares a version other than 1000.
    #[error("unsupported shape file version {0}")]
    BadVersion(i32),
    /// A record header or content runs past the end of the file.
    #[error("record {record} is truncated")]
    TruncatedRecord {
        /// Zero-based record position.
        record: usize,
    },
    /// A record uses a shape type this decoder does not read.
    #[error("record {record} has unsupported shape type {code}")]
    UnsupportedShapeType {
        /// Zero-based record position.
        record: usize,
        /// Numeric shape type.
        code: i32,
    },
    /// A record's part or point counts are inconsistent.
    #[error("record {record} is invalid: {reason}")]
    InvalidRecord {
        /// Zero-based record position.
        record: usize,
        /// What was inconsistent.
        reason: String,
    },
}

/// Name of a shape type code, as used in error messages.
#[must_use]
pub const fn shape_type_name(code: i32) -> &'static str {
    match code {
        0 => "Null",
        1 => "Point",
        3 => "PolyLine",
        5 => "Polygon",
        8 => "MultiPoint",
        11 => "PointZ",
        13 => "PolyLineZ",
        15 => "PolygonZ",
        18 => "MultiPointZ",
        21 => "PointM",
        23 => "PolyLineM",
        25 => "PolygonM",
        28 => "MultiPointM",
        31 => "MultiPatch",
        _ => "Unknown",
    }
}

/// Decode every record of a `.shp` file.
///
/// Null shapes decode to `None` so records keep their position.
///
/// # Errors
/// Returns [`ShpError`] for a bad header, a truncated or inconsistent record,
/// or an unsupported shape type.
pub fn parse_shp(bytes: &[u8]) -> Result<Vec<Option<Geometry<f64>>>, ShpError> {
    let header = bytes.get(..HEADER_LEN).ok_or(ShpError::TruncatedHeader)?;
    let file_code = header.get(..4).map_or(0, BigEndian::read_i32);
    if file_code != FILE_CODE {
        return Err(ShpError::BadFileCode(file_code));
    }
    let version = header.get(28..32).map_or(0, LittleEndian::read_i32);
    if version != VERSION {
        return Err(ShpError::BadVersion(version));
    }
    let declared_len = header
        .get(24..28)
        .map(BigEndian::read_i32)
        .and_then(|words| usize::try_from(words).ok())
        .map_or(bytes.len(), |words| words.saturating_mul(2));
    let end = declared_len.min(bytes.len());

    let mut geometries = Vec::new();
    let mut offset = HEADER_LEN;
    while offset + RECORD_HEADER_LEN <= end {
        let record = geometries.len();
        let words = bytes
            .get(offset + 4..offset + 8)
            .map(BigEndian::read_i32)
            .and_then(|words| usize::try_from(words).ok())
            .ok_or(ShpError::TruncatedRecord { record })?;
        let content_start = offset + RECORD_HEADER_LEN;
        let content_end = content_start.saturating_add(words.saturating_mul(2));
        let content = bytes
            .get(content_start..content_end)
            .ok_or(ShpError::TruncatedRecord { record })?;
        geometries.push(decode_record(content, record)?);
        offset = content_end;
    }
    Ok(geometries)
}

/// Little-endian view of one record's content.
struct Content<'a> {
    bytes: &'a [u8],
    record: usize,
}

impl Content<'_> {
    fn truncated(&self) -> ShpError {
        ShpError::TruncatedRecord {
            record: self.record,
        }
    }

    fn i32_at(&self, offset: usize) -> Result<i32, ShpError> {
        self.bytes
            .get(offset..offset + 4)
            .map(LittleEndian::read_i32)
            .ok_or_else(|| self.truncated())
    }

    fn count_at(&self, offset: usize) -> Result<usize, ShpError> {
        let value = self.i32_at(offset)?;
        usize::try_from(value).map_err(|_| ShpError::InvalidRecord {
            record: self.record,
            reason: format!("negative count {value}"),
        })
    }

    fn coord_at(&self, offset: usize) -> Result<Coord<f64>, ShpError> {
        let pair = self
            .bytes
            .get(offset..offset + POINT_LEN)
            .ok_or_else(|| self.truncated())?;
        let (x, y) = pair.split_at(8);
        Ok(Coord {
            x: LittleEndian::read_f64(x),
            y: LittleEndian::read_f64(y),
        })
    }

    fn coords(&self, offset: usize, count: usize) -> Result<Vec<Coord<f64>>, ShpError> {
        let len = count
            .checked_mul(POINT_LEN)
            .ok_or_else(|| self.truncated())?;
        self.bytes
            .get(offset..offset + len)
            .ok_or_else(|| self.truncated())?;
        (0..count)
            .map(|index| self.coord_at(offset + index * POINT_LEN))
            .collect()
    }

    /// Read the parts and points of a PolyLine or Polygon record.
    fn parts(&self) -> Result<Vec<Vec<Coord<f64>>>, ShpError> {
        let num_parts = self.count_at(4 + BOX_LEN)?;
        let num_points = self.count_at(8 + BOX_LEN)?;
        let parts_at = 12 + BOX_LEN;
        let starts = (0..num_parts)
            .map(|index| self.count_at(parts_at + index * 4))
            .collect::<Result<Vec<_>, _>>()?;
        let points = self.coords(parts_at + num_parts * 4, num_points)?;

        let mut parts = Vec::with_capacity(num_parts);
        for (index, start) in starts.iter().enumerate() {
            let stop = starts.get(index + 1).copied().unwrap_or(num_points);
            let part = points.get(*start..stop).ok_or_else(|| ShpError::InvalidRecord {
                record: self.record,
                reason: format!("part {index} spans points {start}..{stop} of {num_points}"),
            })?;
            parts.push(part.to_vec());
        }
        Ok(parts)
    }
}

fn decode_record(bytes: &[u8], record: usize) -> Result<Option<Geometry<f64>>, ShpError> {
    let content = Content { bytes, record };
    let code = content.i32_at(0)?;
    let geometry = match code {
        0 => return Ok(None),
        1 | 11 | 21 => Geometry::Point(Point(content.coord_at(4)?)),
        8 | 18 | 28 => {
            let count = content.count_at(4 + BOX_LEN)?;
            let points = content.coords(8 + BOX_LEN, count)?;
            match single(points) {
                Ok(point) => Geometry::Point(Point(point)),
                Err(points) => {
                    Geometry::MultiPoint(MultiPoint(points.into_iter().map(Point).collect()))
                }
            }
        }
        3 | 13 | 23 => match single(content.parts()?) {
            Ok(line) => Geometry::LineString(LineString(line)),
            Err(parts) => {
                Geometry::MultiLineString(MultiLineString(parts.into_iter().map(LineString).collect()))
            }
        },
        5 | 15 | 25 => {
            let rings = content.parts()?.into_iter().map(LineString).collect();
            match single(assemble_polygons(rings).0) {
                Ok(polygon) => Geometry::Polygon(polygon),
                Err(polygons) => Geometry::MultiPolygon(MultiPolygon(polygons)),
            }
        }
        _ => return Err(ShpError::UnsupportedShapeType { record, code }),
    };
    Ok(Some(geometry))
}

/// The only element of `items`, or all of them when there are zero or many.
fn single<T>(mut items: Vec<T>) -> Result<T, Vec<T>> {
    if items.len() == 1 {
        items.pop().ok_or(items)
    } else {
        Err(items)
    }
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "fixture buffers have fixed layouts")]
mod tests {
    use super::*;
    use rstest::rstest;

    fn header(shape_type: i32, total_len: usize) -> Vec<u8> {
        let mut out = vec![0; HEADER_LEN];
        if let Some(slot) = out.get_mut(..4) {
            BigEndian::write_i32(slot, FILE_CODE);
        }
        if let Some(slot) = out.get_mut(24..28) {
            BigEndian::write_i32(slot, i32::try_from(total_len / 2).expect("small file"));
        }
        if let Some(slot) = out.get_mut(28..32) {
            LittleEndian::write_i32(slot, VERSION);
        }
        if let Some(slot) = out.get_mut(32..36) {
            LittleEndian::write_i32(slot, shape_type);
        }
        out
    }

    fn file(records: &[Vec<u8>]) -> Vec<u8> {
        let total = HEADER_LEN + records.iter().map(|r| r.len() + 8).sum::<usize>();
        let mut out = header(1, total);
        for (index, content) in records.iter().enumerate() {
            let mut record_header = [0; 8];
            BigEndian::write_i32(&mut record_header[..4], i32::try_from(index + 1).expect("few"));
            BigEndian::write_i32(
                &mut record_header[4..],
                i32::try_from(content.len() / 2).expect("small record"),
            );
            out.extend_from_slice(&record_header);
            out.extend_from_slice(content);
        }
        out
    }

    fn point_record(code: i32, x: f64, y: f64) -> Vec<u8> {
        let mut out = vec![0; 20];
        LittleEndian::write_i32(&mut out[..4], code);
        LittleEndian::write_f64(&mut out[4..12], x);
        LittleEndian::write_f64(&mut out[12..20], y);
        out
    }

    #[rstest]
    #[case::plain(1)]
    #[case::with_z(11)]
    #[case::with_m(21)]
    fn decodes_points_in_every_dimension(#[case] code: i32) {
        let mut record = point_record(code, 1.5, -2.5);
        // Trailing Z and M values are ignored.
        record.extend_from_slice(&[0; 16]);
        let shapes = parse_shp(&file(&[record])).expect("decodes");
        assert_eq!(shapes, [Some(Geometry::Point(Point::new(1.5, -2.5)))]);
    }

    #[rstest]
    fn null_shapes_keep_their_position() {
        let null = vec![0; 4];
        let shapes = parse_shp(&file(&[null, point_record(1, 3.0, 4.0)])).expect("decodes");
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes.first(), Some(&None));
    }

    #[rstest]
    #[case::multipatch(31)]
    #[case::unknown(7)]
    fn rejects_unsupported_shape_types(#[case] code: i32) {
        let mut record = vec![0; 44];
        LittleEndian::write_i32(&mut record[..4], code);
        let err = parse_shp(&file(&[record])).expect_err("unsupported");
        assert_eq!(err, ShpError::UnsupportedShapeType { record: 0, code });
    }

    #[rstest]
    fn rejects_bad_headers() {
        assert_eq!(parse_shp(&[0; 10]), Err(ShpError::TruncatedHeader));
        let mut bytes = header(1, HEADER_LEN);
        bytes[3] = 0;
        assert!(matches!(parse_shp(&bytes), Err(ShpError::BadFileCode(_))));
    }

    #[rstest]
    fn rejects_parts_outside_the_point_array() {
        let mut record = vec![0; 4 + 32 + 8 + 4 + 16];
        LittleEndian::write_i32(&mut record[..4], 3);
        LittleEndian::write_i32(&mut record[36..40], 1);
        LittleEndian::write_i32(&mut record[40..44], 1);
        LittleEndian::write_i32(&mut record[44..48], 5);
        let err = parse_shp(&file(&[record])).expect_err("invalid part");
        assert!(matches!(err, ShpError::InvalidRecord { record: 0, .. }));
    }

    #[rstest]
    #[case::parts(i32::MAX, 1)]
    #[case::points(1, i32::MAX)]
    fn rejects_counts_larger_than_the_record(#[case] parts: i32, #[case] points: i32) {
        let mut record = vec![0; 4 + 32 + 8 + 4 + 16];
        LittleEndian::write_i32(&mut record[..4], 3);
        LittleEndian::write_i32(&mut record[36..40], parts);
        LittleEndian::write_i32(&mut record[40..44], points);
        let err = parse_shp(&file(&[record])).expect_err("oversized count");
        assert_eq!(err, ShpError::TruncatedRecord { record: 0 });
    }

    #[rstest]
    fn rejects_record_length_beyond_the_file() {
        let mut bytes = file(&[point_record(1, 0.0, 0.0)]);
        BigEndian::write_i32(&mut bytes[HEADER_LEN + 4..HEADER_LEN + 8], i32::MAX);
        let err = parse_shp(&bytes).expect_err("oversized record");
        assert_eq!(err, ShpError::TruncatedRecord { record: 0 });
    }

    #[rstest]
    fn truncated_record_is_reported() {
        let mut bytes = file(&[point_record(1, 0.0, 0.0)]);
        // The header still declares the full length.
        bytes.truncate(bytes.len() - 4);
        let err = parse_shp(&bytes).expect_err("truncated");
        assert_eq!(err, ShpError::TruncatedRecord { record: 0 });
    }
}
