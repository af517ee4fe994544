//! Shapefile, attribute table and photo builders shared by the integration
//! tests.

use std::future::Future;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tokio::runtime::Builder;

/// ESRI-style WKT for geographic WGS 84, without an authority clause.
pub const WGS84_PRJ: &str = concat!(
    "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",",
    "SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],",
    "PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]"
);

/// One shape record for [`shp`].
#[derive(Debug, Clone)]
pub enum Shape {
    /// Shape type 0.
    Null,
    /// Shape type 1.
    Point(f64, f64),
    /// Shape type 11, with elevation and measure.
    PointZ(f64, f64, f64, f64),
    /// Shape type 8.
    MultiPoint(Vec<(f64, f64)>),
    /// Shape type 3, one vertex list per part.
    PolyLine(Vec<Vec<(f64, f64)>>),
    /// Shape type 5, one vertex list per ring.
    Polygon(Vec<Vec<(f64, f64)>>),
    /// Any other shape type with zeroed content.
    Other(i32),
}

fn push_i32_be(out: &mut Vec<u8>, value: i32) {
    let mut buf = [0; 4];
    BigEndian::write_i32(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn push_i32_le(out: &mut Vec<u8>, value: i32) {
    let mut buf = [0; 4];
    LittleEndian::write_i32(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn push_f64_le(out: &mut Vec<u8>, value: f64) {
    let mut buf = [0; 8];
    LittleEndian::write_f64(&mut buf, value);
    out.extend_from_slice(&buf);
}

fn small(value: usize) -> i32 {
    i32::try_from(value).expect("fixture sizes fit in i32")
}

fn push_box(out: &mut Vec<u8>) {
    for _ in 0..4 {
        push_f64_le(out, 0.0);
    }
}

fn push_parts(out: &mut Vec<u8>, code: i32, parts: &[Vec<(f64, f64)>]) {
    push_i32_le(out, code);
    push_box(out);
    push_i32_le(out, small(parts.len()));
    push_i32_le(out, small(parts.iter().map(Vec::len).sum()));
    let mut start = 0;
    for part in parts {
        push_i32_le(out, small(start));
        start += part.len();
    }
    for (x, y) in parts.iter().flatten() {
        push_f64_le(out, *x);
        push_f64_le(out, *y);
    }
}

fn content(shape: &Shape) -> Vec<u8> {
    let mut out = Vec::new();
    match shape {
        Shape::Null => push_i32_le(&mut out, 0),
        Shape::Point(x, y) => {
            push_i32_le(&mut out, 1);
            push_f64_le(&mut out, *x);
            push_f64_le(&mut out, *y);
        }
        Shape::PointZ(x, y, z, m) => {
            push_i32_le(&mut out, 11);
            for value in [x, y, z, m] {
                push_f64_le(&mut out, *value);
            }
        }
        Shape::MultiPoint(points) => {
            push_i32_le(&mut out, 8);
            push_box(&mut out);
            push_i32_le(&mut out, small(points.len()));
            for (x, y) in points {
                push_f64_le(&mut out, *x);
                push_f64_le(&mut out, *y);
            }
        }
        Shape::PolyLine(parts) => push_parts(&mut out, 3, parts),
        Shape::Polygon(rings) => push_parts(&mut out, 5, rings),
        Shape::Other(code) => {
            push_i32_le(&mut out, *code);
            out.extend_from_slice(&[0; 40]);
        }
    }
    out
}

/// Assemble a `.shp` file from `shapes`.
pub fn shp(shapes: &[Shape]) -> Vec<u8> {
    let mut body = Vec::new();
    for (index, shape) in shapes.iter().enumerate() {
        let record = content(shape);
        push_i32_be(&mut body, small(index + 1));
        push_i32_be(&mut body, small(record.len() / 2));
        body.extend_from_slice(&record);
    }
    let mut out = Vec::with_capacity(100 + body.len());
    push_i32_be(&mut out, 9994);
    out.extend_from_slice(&[0; 20]);
    push_i32_be(&mut out, small((100 + body.len()) / 2));
    push_i32_le(&mut out, 1000);
    push_i32_le(&mut out, 1);
    push_box(&mut out);
    out.extend_from_slice(&[0; 32]);
    out.extend_from_slice(&body);
    out
}

/// Assemble a `.dbf` file with character fields of the given widths.
pub fn dbf(fields: &[(&str, u8)], records: &[&[&str]]) -> Vec<u8> {
    let header_len = 32 + fields.len() * 32 + 1;
    let record_len = 1 + fields.iter().map(|(_, width)| usize::from(*width)).sum::<usize>();
    let mut out = vec![3, 124, 1, 1];
    let mut buf = [0; 4];
    LittleEndian::write_u32(&mut buf, u32::try_from(records.len()).expect("few records"));
    out.extend_from_slice(&buf);
    let mut lengths = [0; 4];
    let (header, record) = lengths.split_at_mut(2);
    LittleEndian::write_u16(header, u16::try_from(header_len).expect("small header"));
    LittleEndian::write_u16(record, u16::try_from(record_len).expect("small record"));
    out.extend_from_slice(&lengths);
    out.resize(32, 0);
    for (name, width) in fields {
        let mut descriptor = name.as_bytes().to_vec();
        descriptor.resize(11, 0);
        descriptor.push(b'C');
        descriptor.resize(16, 0);
        descriptor.push(*width);
        descriptor.resize(32, 0);
        out.extend_from_slice(&descriptor);
    }
    out.push(0x0D);
    for values in records {
        out.push(b' ');
        for ((_, width), value) in fields.iter().zip(values.iter()) {
            let mut cell = value.as_bytes().to_vec();
            cell.resize(usize::from(*width), b' ');
            out.extend_from_slice(&cell);
        }
    }
    out.push(0x1A);
    out
}

/// A JFIF JPEG without EXIF data.
pub fn plain_jpeg() -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34, 0x56, 0xFF, 0xD9]);
    out
}

/// Run `future` to completion on a current-thread runtime.
pub fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}

/// Assert that two values differ by less than `tolerance`.
#[expect(
    clippy::float_arithmetic,
    reason = "test delta computation requires float maths"
)]
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= tolerance,
        "expected {expected}, got {actual} (delta {delta})"
    );
}
