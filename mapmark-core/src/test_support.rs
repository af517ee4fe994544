//! Deterministic [`CoordTransform`] implementations for unit and behaviour
//! tests.

use geo::Coord;

use crate::{CoordTransform, ProjectionError};

/// Shifts every coordinate by a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetTransform {
    dx: f64,
    dy: f64,
}

impl OffsetTransform {
    /// Create a transform adding `dx` to x and `dy` to y.
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl CoordTransform for OffsetTransform {
    #[expect(
        clippy::float_arithmetic,
        reason = "the transform is a plain coordinate shift"
    )]
    fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        Ok(Coord {
            x: coord.x + self.dx,
            y: coord.y + self.dy,
        })
    }
}

/// Rejects every coordinate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FailingTransform;

impl CoordTransform for FailingTransform {
    fn forward(&self, _coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        Err(ProjectionError::new("coordinate outside projection domain"))
    }
}
