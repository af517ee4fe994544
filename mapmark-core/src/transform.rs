//! Coordinate transform seam used by the geometry reprojector.

use geo::Coord;
use thiserror::Error;

/// Error raised by a [`CoordTransform`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProjectionError {
    message: String,
}

impl ProjectionError {
    /// Wrap a backend error message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The backend error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Maps a single `(x, y)` coordinate from a source CRS to a destination CRS.
pub trait CoordTransform {
    /// Transform one coordinate.
    ///
    /// # Errors
    /// Returns [`ProjectionError`] when the coordinate cannot be projected.
    fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError>;
}

impl<T: CoordTransform + ?Sized> CoordTransform for &T {
    fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        (**self).forward(coord)
    }
}

impl<T: CoordTransform + ?Sized> CoordTransform for Box<T> {
    fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        (**self).forward(coord)
    }
}
