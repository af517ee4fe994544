//! JPEG marker walking and APP1 splicing.
//!
//! Only the header segments between SOI and SOS are inspected. Everything from
//! the SOS marker onwards, entropy-coded data included, is carried over
//! untouched when a new EXIF segment is spliced in.

use byteorder::{BigEndian, ByteOrder};

use crate::ExifError;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const TEM: u8 = 0x01;

/// Identifier that opens the payload of an EXIF `APP1` segment.
pub const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

/// One marker segment in the JPEG header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Marker byte following `0xFF`.
    pub marker: u8,
    /// Offset of the `0xFF` marker prefix.
    pub start: usize,
    /// Offset one past the last byte of the segment.
    pub end: usize,
}

impl Segment {
    /// Payload byte range, excluding the marker and length field.
    const fn payload_start(&self) -> usize {
        self.start + 4
    }
}

/// Header segments of a JPEG stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegSegments {
    segments: Vec<Segment>,
}

impl JpegSegments {
    /// Walk the markers of `bytes` from SOI up to SOS or EOI.
    ///
    /// # Errors
    /// Returns [`ExifError::InvalidImageFormat`] when the SOI marker is
    /// missing, a segment is truncated, or the stream ends before the scan.
    pub fn parse(bytes: &[u8]) -> Result<Self, ExifError> {
        if bytes.get(..2) != Some([MARKER_PREFIX, SOI].as_slice()) {
            return Err(ExifError::invalid("missing JPEG start-of-image marker"));
        }
        let mut segments = Vec::new();
        let mut pos = 2;
        loop {
            if bytes.get(pos) != Some(&MARKER_PREFIX) {
                return Err(ExifError::invalid(format!(
                    "expected a segment marker at offset {pos}"
                )));
            }
            // Fill bytes may pad any marker.
            while bytes.get(pos + 1) == Some(&MARKER_PREFIX) {
                pos += 1;
            }
            let marker = *bytes
                .get(pos + 1)
                .ok_or_else(|| ExifError::invalid("stream ended before start of scan"))?;
            match marker {
                EOI => break,
                TEM | 0xD0..=0xD7 => {
                    segments.push(Segment {
                        marker,
                        start: pos,
                        end: pos + 2,
                    });
                    pos += 2;
                }
                _ => {
                    let length = bytes
                        .get(pos + 2..pos + 4)
                        .map(BigEndian::read_u16)
                        .ok_or_else(|| ExifError::invalid("truncated segment length"))?;
                    if length < 2 {
                        return Err(ExifError::invalid(format!(
                            "segment length {length} is shorter than its length field"
                        )));
                    }
                    let end = pos + 2 + usize::from(length);
                    if end > bytes.len() {
                        return Err(ExifError::invalid(format!(
                            "segment at offset {pos} runs past the end of the stream"
                        )));
                    }
                    segments.push(Segment {
                        marker,
                        start: pos,
                        end,
                    });
                    if marker == SOS {
                        break;
                    }
                    pos = end;
                }
            }
        }
        Ok(Self { segments })
    }

    /// Segments in stream order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First `APP1` segment carrying an EXIF payload.
    #[must_use]
    pub fn exif_segment(&self, bytes: &[u8]) -> Option<Segment> {
        self.segments.iter().copied().find(|segment| {
            segment.marker == APP1
                && bytes
                    .get(segment.payload_start()..segment.end)
                    .is_some_and(|payload| payload.starts_with(EXIF_HEADER))
        })
    }

    /// TIFF structure inside the EXIF segment, if one exists.
    #[must_use]
    pub fn exif_payload<'a>(&self, bytes: &'a [u8]) -> Option<&'a [u8]> {
        let segment = self.exif_segment(bytes)?;
        bytes.get(segment.payload_start() + EXIF_HEADER.len()..segment.end)
    }

    /// Replace the EXIF segment of `bytes` with `app1`, or insert it when the
    /// stream has none.
    ///
    /// A new segment goes after SOI, or after a leading `APP0` so JFIF
    /// readers still find their header first.
    #[must_use]
    pub fn splice_exif(&self, bytes: &[u8], app1: &[u8]) -> Vec<u8> {
        let (head_end, tail_start) = match self.exif_segment(bytes) {
            Some(existing) => (existing.start, existing.end),
            None => {
                let insert_at = self
                    .segments
                    .first()
                    .filter(|segment| segment.marker == APP0)
                    .map_or(2, |segment| segment.end);
                (insert_at, insert_at)
            }
        };
        let head = bytes.get(..head_end).unwrap_or_default();
        let tail = bytes.get(tail_start..).unwrap_or_default();
        let mut out = Vec::with_capacity(head.len() + app1.len() + tail.len());
        out.extend_from_slice(head);
        out.extend_from_slice(app1);
        out.extend_from_slice(tail);
        out
    }
}

/// Wrap an encoded TIFF structure in an EXIF `APP1` segment.
///
/// # Errors
/// Returns [`ExifError::SegmentTooLarge`] when the segment length would not
/// fit the 16-bit length field.
pub fn app1_segment(tiff: &[u8]) -> Result<Vec<u8>, ExifError> {
    let length = 2 + EXIF_HEADER.len() + tiff.len();
    let encoded_length =
        u16::try_from(length).map_err(|_| ExifError::SegmentTooLarge { size: length })?;
    let mut segment = Vec::with_capacity(length + 2);
    segment.extend_from_slice(&[MARKER_PREFIX, APP1]);
    let mut length_field = [0; 2];
    BigEndian::write_u16(&mut length_field, encoded_length);
    segment.extend_from_slice(&length_field);
    segment.extend_from_slice(EXIF_HEADER);
    segment.extend_from_slice(tiff);
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample(with_app0: bool) -> Vec<u8> {
        let mut bytes = vec![0xFF, SOI];
        if with_app0 {
            bytes.extend_from_slice(&[0xFF, APP0, 0x00, 0x07, b'J', b'F', b'I', b'F', 0x00]);
        }
        bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x03, 0x42]);
        bytes.extend_from_slice(&[0xFF, SOS, 0x00, 0x03, 0x01, 0xAB, 0xCD, 0xFF, EOI]);
        bytes
    }

    #[rstest]
    fn walks_to_start_of_scan() {
        let bytes = sample(true);
        let segments = JpegSegments::parse(&bytes).expect("valid jpeg");
        let markers: Vec<u8> = segments.segments().iter().map(|s| s.marker).collect();
        assert_eq!(markers, [APP0, 0xDB, SOS]);
        assert!(segments.exif_segment(&bytes).is_none());
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::png(&[0x89, b'P', b'N', b'G'])]
    #[case::truncated_length(&[0xFF, SOI, 0xFF, APP1, 0x00])]
    #[case::overlong_segment(&[0xFF, SOI, 0xFF, APP1, 0x00, 0x10, 0x00])]
    #[case::no_scan(&[0xFF, SOI, 0xFF, 0xDB, 0x00, 0x02])]
    fn rejects_malformed_streams(#[case] bytes: &[u8]) {
        let err = JpegSegments::parse(bytes).expect_err("invalid stream");
        assert!(matches!(err, ExifError::InvalidImageFormat { .. }));
    }

    #[rstest]
    #[case::after_app0(true, 11)]
    #[case::after_soi(false, 2)]
    fn inserts_new_segment(#[case] with_app0: bool, #[case] offset: usize) {
        let bytes = sample(with_app0);
        let segments = JpegSegments::parse(&bytes).expect("valid jpeg");
        let app1 = app1_segment(b"TIFF").expect("small segment");
        let spliced = segments.splice_exif(&bytes, &app1);
        assert_eq!(spliced.get(offset..offset + app1.len()), Some(app1.as_slice()));
        assert_eq!(spliced.len(), bytes.len() + app1.len());
        assert!(spliced.ends_with(bytes.get(offset..).expect("tail")));
    }

    #[rstest]
    fn replaces_existing_segment_in_place() {
        let bytes = sample(false);
        let segments = JpegSegments::parse(&bytes).expect("valid jpeg");
        let first = segments.splice_exif(&bytes, &app1_segment(b"old").expect("segment"));
        let reparsed = JpegSegments::parse(&first).expect("valid jpeg");
        let second = reparsed.splice_exif(&first, &app1_segment(b"newer").expect("segment"));
        let segments_after = JpegSegments::parse(&second).expect("valid jpeg");
        assert_eq!(segments_after.exif_payload(&second), Some(b"newer".as_slice()));
        assert_eq!(segments_after.segments().len(), 3);
    }

    #[rstest]
    fn oversized_payload_is_rejected() {
        let tiff = vec![0; usize::from(u16::MAX)];
        let err = app1_segment(&tiff).expect_err("too large");
        assert!(matches!(err, ExifError::SegmentTooLarge { .. }));
    }
}
