//! Core domain types for the mapmark toolkit.
//!
//! The crate holds the pieces shared by the EXIF codec and the shapefile
//! ingester: rational GPS coordinates, features with their attribute rows,
//! and the structural reprojector that walks a geometry through a
//! [`CoordTransform`].
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod coord;
mod feature;
mod reproject;
mod transform;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(not(test), doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use coord::{
    CoordinateError, DmsTerm, GpsPosition, GpsReference, Rational, RationalGpsValue,
    from_rational, to_rational,
};
pub use feature::{
    AttributeRow, AttributeRowError, AttributeValue, DefaultProjectionReason, Feature,
    FieldSchema, IngestWarning, Shapefile,
};
pub use reproject::{ReprojectError, geometry_kind, reproject};
pub use transform::{CoordTransform, ProjectionError};
