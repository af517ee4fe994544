//! EXIF GPS codec for JPEG images.
//!
//! The codec reads the GPS position from a JPEG's EXIF segment and writes a
//! new one while keeping every other byte of the file, and every non-GPS
//! EXIF entry, exactly as it was. Images can be handled as raw bytes or as
//! base64 data URLs.
#![forbid(unsafe_code)]

mod container;
mod error;
mod gps;
pub mod jpeg;
pub mod tag;
pub mod tiff;

pub use container::{DATA_URL_PREFIX, decode_data_url, encode_data_url};
pub use error::{Axis, ExifError};
pub use gps::{read_exif, read_gps, write_gps};
pub use jpeg::JpegSegments;
pub use tiff::{Endian, Entry, ExifBlock, FieldType, Ifd, Thumbnail};
