//! Test helpers for building folders of shapefiles and photos on disk.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// A temporary directory addressed by a UTF-8 path.
#[derive(Debug)]
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn write(&self, name: &str, bytes: &[u8]) {
        fs::write(self.root.join(name), bytes).expect("write fixture file");
    }

    pub(super) fn read(&self, name: &str) -> Vec<u8> {
        fs::read(self.root.join(name)).expect("read fixture file")
    }
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

/// A `.shp` file holding one point record per coordinate pair.
pub(super) fn point_shapefile(points: &[(f64, f64)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (index, (x, y)) in points.iter().enumerate() {
        push_i32_be(&mut body, i32::try_from(index + 1).expect("few records"));
        push_i32_be(&mut body, 10);
        push_i32_le(&mut body, 1);
        push_f64_le(&mut body, *x);
        push_f64_le(&mut body, *y);
    }
    let mut out = Vec::new();
    push_i32_be(&mut out, 9994);
    out.extend_from_slice(&[0; 20]);
    push_i32_be(
        &mut out,
        i32::try_from((100 + body.len()) / 2).expect("small file"),
    );
    push_i32_le(&mut out, 1000);
    push_i32_le(&mut out, 1);
    out.extend_from_slice(&[0; 64]);
    out.extend_from_slice(&body);
    out
}

/// A JFIF JPEG without EXIF data.
pub(super) fn plain_jpeg() -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34, 0x56, 0xFF, 0xD9]);
    out
}

/// Assert that two values differ by less than `tolerance`.
#[expect(
    clippy::float_arithmetic,
    reason = "test delta computation requires float maths"
)]
pub(super) fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= tolerance,
        "expected {expected}, got {actual} (delta {delta})"
    );
}
