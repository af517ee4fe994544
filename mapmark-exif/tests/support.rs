//! Byte-level JPEG and TIFF builders shared by the integration tests.
//!
//! The builders lay out bytes independently of the codec so tests exercise
//! its parser against hand-assembled input.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Epsilon for coordinate comparisons, a little above one milli-arc-second.
const COORDINATE_EPSILON: f64 = 3.0e-7;

/// Scan bytes placed after SOS so tests can check they survive untouched.
pub const SCAN_DATA: &[u8] = &[0x12, 0x34, 0xFF, 0x00, 0x56, 0x78, 0x9A];

/// A raw IFD entry whose value is already in the target byte order.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Tag number.
    pub tag: u16,
    /// TIFF field type code.
    pub field_type: u16,
    /// Number of values.
    pub count: u32,
    /// Encoded value bytes.
    pub value: Vec<u8>,
}

/// Byte order used by [`tiff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// `II` header.
    Intel,
    /// `MM` header.
    Motorola,
}

impl Order {
    fn u16(self, value: u16) -> [u8; 2] {
        let mut buf = [0; 2];
        match self {
            Self::Intel => LittleEndian::write_u16(&mut buf, value),
            Self::Motorola => BigEndian::write_u16(&mut buf, value),
        }
        buf
    }

    fn u32(self, value: u32) -> [u8; 4] {
        let mut buf = [0; 4];
        match self {
            Self::Intel => LittleEndian::write_u32(&mut buf, value),
            Self::Motorola => BigEndian::write_u32(&mut buf, value),
        }
        buf
    }
}

/// An `ASCII` entry with a NUL terminator.
pub fn ascii(tag: u16, text: &str) -> RawEntry {
    let mut value = text.as_bytes().to_vec();
    value.push(0);
    RawEntry {
        tag,
        field_type: 2,
        count: u32::try_from(value.len()).expect("short text"),
        value,
    }
}

/// A `SHORT` entry.
pub fn short(order: Order, tag: u16, value: u16) -> RawEntry {
    RawEntry {
        tag,
        field_type: 3,
        count: 1,
        value: order.u16(value).to_vec(),
    }
}

/// A `RATIONAL` entry.
pub fn rationals(order: Order, tag: u16, values: &[(u32, u32)]) -> RawEntry {
    let mut value = Vec::new();
    for (numerator, denominator) in values {
        value.extend_from_slice(&order.u32(*numerator));
        value.extend_from_slice(&order.u32(*denominator));
    }
    RawEntry {
        tag,
        field_type: 5,
        count: u32::try_from(values.len()).expect("few values"),
        value,
    }
}

/// An `UNDEFINED` entry, such as a maker note.
pub fn undefined(tag: u16, bytes: &[u8]) -> RawEntry {
    RawEntry {
        tag,
        field_type: 7,
        count: u32::try_from(bytes.len()).expect("short blob"),
        value: bytes.to_vec(),
    }
}

fn ifd_len(entries: &[RawEntry]) -> usize {
    let data: usize = entries
        .iter()
        .filter(|entry| entry.value.len() > 4)
        .map(|entry| entry.value.len() + entry.value.len() % 2)
        .sum();
    2 + 12 * entries.len() + 4 + data
}

fn write_ifd(out: &mut Vec<u8>, order: Order, entries: &[RawEntry]) {
    let mut data_at = out.len() + 2 + 12 * entries.len() + 4;
    let mut data = Vec::new();
    out.extend_from_slice(&order.u16(u16::try_from(entries.len()).expect("few entries")));
    for entry in entries {
        out.extend_from_slice(&order.u16(entry.tag));
        out.extend_from_slice(&order.u16(entry.field_type));
        out.extend_from_slice(&order.u32(entry.count));
        if entry.value.len() <= 4 {
            let mut inline = entry.value.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&order.u32(u32::try_from(data_at).expect("small tiff")));
            data.extend_from_slice(&entry.value);
            if entry.value.len() % 2 == 1 {
                data.push(0);
            }
            data_at += entry.value.len() + entry.value.len() % 2;
        }
    }
    out.extend_from_slice(&order.u32(0));
    out.extend_from_slice(&data);
}

/// Assemble a TIFF structure with IFD0 and, optionally, Exif and GPS IFDs.
///
/// Entries must be supplied in ascending tag order.
pub fn tiff(
    order: Order,
    ifd0: &[RawEntry],
    exif: Option<&[RawEntry]>,
    gps: Option<&[RawEntry]>,
) -> Vec<u8> {
    let mut root = ifd0.to_vec();
    let pointer = |tag| RawEntry {
        tag,
        field_type: 4,
        count: 1,
        value: vec![0; 4],
    };
    if exif.is_some() {
        root.push(pointer(0x8769));
    }
    if gps.is_some() {
        root.push(pointer(0x8825));
    }
    let exif_at = 8 + ifd_len(&root);
    let gps_at = exif_at + exif.map_or(0, ifd_len);
    for entry in &mut root {
        match entry.tag {
            0x8769 => entry.value = order.u32(u32::try_from(exif_at).expect("small")).to_vec(),
            0x8825 => entry.value = order.u32(u32::try_from(gps_at).expect("small")).to_vec(),
            _ => {}
        }
    }

    let mut out = match order {
        Order::Intel => b"II".to_vec(),
        Order::Motorola => b"MM".to_vec(),
    };
    out.extend_from_slice(&order.u16(42));
    out.extend_from_slice(&order.u32(8));
    write_ifd(&mut out, order, &root);
    if let Some(entries) = exif {
        write_ifd(&mut out, order, entries);
    }
    if let Some(entries) = gps {
        write_ifd(&mut out, order, entries);
    }
    out
}

/// A baseline JPEG: SOI, a JFIF APP0, a quantisation table, SOS with
/// [`SCAN_DATA`], and EOI.
pub fn plain_jpeg() -> Vec<u8> {
    jpeg_with_app1(None)
}

/// A baseline JPEG carrying `tiff` in an EXIF APP1 segment after APP0.
pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    jpeg_with_app1(Some(tiff))
}

fn jpeg_with_app1(tiff: Option<&[u8]>) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[0x01, 0x02, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    if let Some(tiff) = tiff {
        let length = u16::try_from(2 + 6 + tiff.len()).expect("small exif");
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&Order::Motorola.u16(length));
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(tiff);
    }
    out.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x05, 0x00, 0x01, 0x02]);
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    out.extend_from_slice(SCAN_DATA);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// Bytes from the SOS marker to the end of the stream.
pub fn scan_tail(jpeg: &[u8]) -> &[u8] {
    let start = jpeg
        .windows(2)
        .position(|pair| pair == [0xFF, 0xDA])
        .expect("jpeg has a scan");
    jpeg.get(start..).expect("tail in range")
}

/// Compare floating-point coordinates within a small epsilon.
#[expect(
    clippy::float_arithmetic,
    reason = "test delta computation requires float maths"
)]
pub fn assert_close(actual: f64, expected: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= COORDINATE_EPSILON,
        "expected {expected}, got {actual} (|Δ| = {delta})"
    );
}
