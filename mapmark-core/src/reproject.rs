//! Structural reprojection of geometries.
//!
//! Every leaf coordinate is passed through a [`CoordTransform`]. The nesting
//! of each geometry kind is preserved exactly:
//!
//! | kind              | levels of nesting above a coordinate |
//! |-------------------|--------------------------------------|
//! | `Point`           | 0                                    |
//! | `LineString`      | 1                                    |
//! | `MultiPoint`      | 1                                    |
//! | `Polygon`         | 2                                    |
//! | `MultiLineString` | 2                                    |
//! | `MultiPolygon`    | 3                                    |

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use thiserror::Error;

use crate::transform::{CoordTransform, ProjectionError};

/// Errors returned by [`reproject`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReprojectError {
    /// The geometry kind cannot be reprojected.
    #[error("unsupported geometry type: {kind}")]
    UnsupportedGeometryType {
        /// Name of the rejected geometry kind.
        kind: String,
    },
    /// A coordinate could not be transformed.
    #[error("failed to transform coordinate")]
    Transform {
        /// Error from the transform backend.
        #[source]
        source: ProjectionError,
    },
}

/// Name of a geometry's kind, as used in error messages.
#[must_use]
pub const fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Reproject every coordinate of `geometry` with `transform`.
///
/// The geometry is consumed; callers must not keep a pre-transform copy that
/// they expect to track the result.
///
/// # Errors
/// Returns [`ReprojectError::UnsupportedGeometryType`] for `Line`, `Rect`,
/// `Triangle` and `GeometryCollection`, and [`ReprojectError::Transform`]
/// when any coordinate fails to project.
///
/// # Examples
///
/// ```
/// use geo::{Coord, Geometry, Point};
/// use mapmark_core::{CoordTransform, ProjectionError, reproject};
///
/// struct Shift;
///
/// impl CoordTransform for Shift {
///     fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
///         Ok(Coord { x: coord.x + 1.0, y: coord.y })
///     }
/// }
///
/// # fn main() -> Result<(), mapmark_core::ReprojectError> {
/// let moved = reproject(Geometry::Point(Point::new(1.0, 2.0)), &Shift)?;
/// assert_eq!(moved, Geometry::Point(Point::new(2.0, 2.0)));
/// # Ok(())
/// # }
/// ```
pub fn reproject<T>(geometry: Geometry<f64>, transform: &T) -> Result<Geometry<f64>, ReprojectError>
where
    T: CoordTransform + ?Sized,
{
    match geometry {
        Geometry::Point(point) => project_point(point, transform).map(Geometry::Point),
        Geometry::MultiPoint(MultiPoint(points)) => points
            .into_iter()
            .map(|point| project_point(point, transform))
            .collect::<Result<Vec<_>, _>>()
            .map(|projected| Geometry::MultiPoint(MultiPoint(projected))),
        Geometry::LineString(line) => project_line(line, transform).map(Geometry::LineString),
        Geometry::MultiLineString(MultiLineString(lines)) => lines
            .into_iter()
            .map(|line| project_line(line, transform))
            .collect::<Result<Vec<_>, _>>()
            .map(|projected| Geometry::MultiLineString(MultiLineString(projected))),
        Geometry::Polygon(polygon) => project_polygon(polygon, transform).map(Geometry::Polygon),
        Geometry::MultiPolygon(MultiPolygon(polygons)) => polygons
            .into_iter()
            .map(|polygon| project_polygon(polygon, transform))
            .collect::<Result<Vec<_>, _>>()
            .map(|projected| Geometry::MultiPolygon(MultiPolygon(projected))),
        other @ (Geometry::Line(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_)
        | Geometry::GeometryCollection(_)) => Err(ReprojectError::UnsupportedGeometryType {
            kind: geometry_kind(&other).to_owned(),
        }),
    }
}

fn project_coord<T>(coord: Coord<f64>, transform: &T) -> Result<Coord<f64>, ReprojectError>
where
    T: CoordTransform + ?Sized,
{
    transform
        .forward(coord)
        .map_err(|source| ReprojectError::Transform { source })
}

fn project_point<T>(point: Point<f64>, transform: &T) -> Result<Point<f64>, ReprojectError>
where
    T: CoordTransform + ?Sized,
{
    project_coord(point.0, transform).map(Point)
}

fn project_line<T>(line: LineString<f64>, transform: &T) -> Result<LineString<f64>, ReprojectError>
where
    T: CoordTransform + ?Sized,
{
    line.0
        .into_iter()
        .map(|coord| project_coord(coord, transform))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString)
}

fn project_polygon<T>(polygon: Polygon<f64>, transform: &T) -> Result<Polygon<f64>, ReprojectError>
where
    T: CoordTransform + ?Sized,
{
    let (exterior, interiors) = polygon.into_inner();
    let projected_exterior = project_line(exterior, transform)?;
    let projected_interiors = interiors
        .into_iter()
        .map(|ring| project_line(ring, transform))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(projected_exterior, projected_interiors))
}
