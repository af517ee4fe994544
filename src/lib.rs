//! Facade crate for the mapmark toolkit.
//!
//! This crate re-exports the coordinate model and EXIF GPS codec, and exposes
//! shapefile ingestion and folder access behind the `ingest` feature.

#![forbid(unsafe_code)]

pub use mapmark_core::{
    AttributeRow, AttributeValue, CoordTransform, CoordinateError, Feature, GpsPosition,
    GpsReference, IngestWarning, ProjectionError, Rational, RationalGpsValue, ReprojectError,
    Shapefile, from_rational, reproject, to_rational,
};
pub use mapmark_exif::{
    ExifBlock, ExifError, decode_data_url, encode_data_url, read_exif, read_gps, write_gps,
};

#[cfg(feature = "ingest")]
pub use mapmark_data::{
    DestinationCrs, IngestCause, IngestFailure, PhotoGeotag, ShapefileSet, ingest_shapefile,
    ingest_shapefiles, load_geotags, save_geotag, save_geotags,
};

#[cfg(feature = "ingest")]
pub use mapmark_fs::{CapFolder, Folder, MemoryFolder};
