//! Shapefile ingestion and photo geotag persistence for mapmark.
//!
//! Responsibilities:
//! - Resolve source and destination projections from PROJ, EPSG and WKT
//!   definitions.
//! - Decode `.shp` and `.dbf` files and reproject their features.
//! - Load and save photo GPS positions through a [`mapmark_fs::Folder`].
//!
//! Boundaries:
//! - Do not encode coordinate or geometry rules (live in `mapmark-core`).
//! - Keep blocking file access off async executors; batch entry points run
//!   each item on a blocking task.
//!
//! Invariants:
//! - One failing shapefile or photo never aborts a batch.
//! - Ingestion never returns a partially ingested shapefile.
#![forbid(unsafe_code)]

pub mod photos;
pub mod projection;
pub mod shapefile;

pub use photos::{
    PhotoError, PhotoGeotag, PhotoRecord, SaveOutcome, discover_photos, is_photo_name,
    load_geotag, load_geotags, load_geotags_concurrently, save_geotag, save_geotags,
};
pub use projection::{
    CrsError, DEFAULT_DESTINATION_CRS, DEFAULT_SOURCE_CRS, DestinationCrs, Proj4Transform,
    ResolvedProjection, assume_default, resolve, to_proj_string,
};
pub use shapefile::{
    IngestCause, IngestFailure, ShapefileSet, discover_shapefiles, ingest_shapefile,
    ingest_shapefiles, shapefile_stem,
};
