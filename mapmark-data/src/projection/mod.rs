//! Source and destination projections.
//!
//! Definitions may be PROJ strings, `EPSG:<code>` identifiers or WKT text
//! from a `.prj` file. Everything is reduced to a PROJ string and handed to
//! `proj4rs`. Geographic coordinates cross this API in degrees even though
//! `proj4rs` works in radians.

pub mod wkt;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use geo::Coord;
use log::{debug, warn};
use mapmark_core::{CoordTransform, DefaultProjectionReason, IngestWarning, ProjectionError};
use proj4rs::Proj;
use thiserror::Error;

use self::wkt::{WktDefinition, WktError};

/// CRS assumed when a shapefile has no usable `.prj`.
pub const DEFAULT_SOURCE_CRS: &str = "EPSG:3857";

/// Destination CRS used when none is configured.
pub const DEFAULT_DESTINATION_CRS: &str = "EPSG:3857";

const WEB_MERCATOR: &str = "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +no_defs";
const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Errors raised while interpreting a CRS definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    /// The definition is blank.
    #[error("empty CRS definition")]
    Empty,
    /// The EPSG code is not in the bundled table.
    #[error("unknown EPSG code {code}")]
    UnknownEpsg {
        /// The code as written.
        code: String,
    },
    /// The text is not a PROJ string, EPSG identifier or WKT.
    #[error("unrecognised CRS definition {definition:?}")]
    Unrecognised {
        /// The definition as written.
        definition: String,
    },
    /// The WKT could not be translated.
    #[error("invalid WKT definition")]
    Wkt {
        /// Translation failure.
        #[from]
        source: WktError,
    },
    /// `proj4rs` rejected the PROJ string.
    #[error("projection {definition:?} rejected: {message}")]
    Proj {
        /// PROJ string handed to `proj4rs`.
        definition: String,
        /// Message from `proj4rs`.
        message: String,
    },
}

/// Reduce a definition to a PROJ string.
///
/// # Errors
/// Returns [`CrsError`] when the definition is blank, names an unknown EPSG
/// code, or is not in a recognised syntax.
pub fn to_proj_string(definition: &str) -> Result<String, CrsError> {
    let trimmed = definition.trim().trim_start_matches('\u{feff}');
    if trimmed.is_empty() {
        return Err(CrsError::Empty);
    }
    if trimmed.starts_with('+') {
        return Ok(trimmed.to_owned());
    }
    if let Some(code) = strip_prefix_ignore_case(trimmed, "EPSG:") {
        return epsg_proj_string(code.trim());
    }
    if wkt::looks_like_wkt(trimmed) {
        return match wkt::read_wkt(trimmed)? {
            WktDefinition::Epsg(code) => epsg_proj_string(&code.to_string()),
            WktDefinition::Proj(proj) => Ok(proj),
        };
    }
    Err(CrsError::Unrecognised {
        definition: trimmed.to_owned(),
    })
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| text.get(prefix.len()..))
        .flatten()
}

fn epsg_proj_string(code: &str) -> Result<String, CrsError> {
    let unknown = || CrsError::UnknownEpsg {
        code: code.to_owned(),
    };
    let number: u32 = code.parse().map_err(|_| unknown())?;
    match number {
        3857 | 3785 | 900_913 | 102_100 | 102_113 => Ok(WEB_MERCATOR.to_owned()),
        4326 => Ok(WGS84.to_owned()),
        _ => u16::try_from(number)
            .ok()
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4.to_owned())
            .ok_or_else(unknown),
    }
}

fn is_geographic(proj_string: &str) -> bool {
    proj_string.split_whitespace().any(|term| {
        matches!(
            term,
            "+proj=longlat" | "+proj=latlong" | "+proj=lonlat" | "+proj=latlon"
        )
    })
}

fn build(proj_string: &str) -> Result<Proj, CrsError> {
    Proj::from_proj_string(proj_string).map_err(|err| CrsError::Proj {
        definition: proj_string.to_owned(),
        message: err.to_string(),
    })
}

/// A validated destination CRS, cheap to clone and share between tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationCrs {
    identifier: Arc<str>,
    proj_string: Arc<str>,
}

impl DestinationCrs {
    /// Validate `identifier` as a destination CRS.
    ///
    /// # Errors
    /// Returns [`CrsError`] when the identifier cannot be interpreted or
    /// `proj4rs` rejects it.
    ///
    /// # Examples
    ///
    /// ```
    /// use mapmark_data::projection::DestinationCrs;
    ///
    /// # fn main() -> Result<(), mapmark_data::projection::CrsError> {
    /// let crs = DestinationCrs::parse("EPSG:4326")?;
    /// assert_eq!(crs.identifier(), "EPSG:4326");
    /// assert!(DestinationCrs::parse("EPSG:not-a-code").is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse(identifier: &str) -> Result<Self, CrsError> {
        let proj_string = to_proj_string(identifier)?;
        build(&proj_string)?;
        Ok(Self {
            identifier: Arc::from(identifier.trim()),
            proj_string: Arc::from(proj_string),
        })
    }

    /// The identifier as configured.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The PROJ string the identifier resolved to.
    #[must_use]
    pub fn proj_string(&self) -> &str {
        &self.proj_string
    }
}

impl Default for DestinationCrs {
    fn default() -> Self {
        Self {
            identifier: Arc::from(DEFAULT_DESTINATION_CRS),
            proj_string: Arc::from(WEB_MERCATOR),
        }
    }
}

impl FromStr for DestinationCrs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DestinationCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

/// Transforms coordinates between two CRSs with `proj4rs`.
pub struct Proj4Transform {
    source: Proj,
    destination: Proj,
    source_geographic: bool,
    destination_geographic: bool,
}

impl fmt::Debug for Proj4Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proj4Transform")
            .field("source_geographic", &self.source_geographic)
            .field("destination_geographic", &self.destination_geographic)
            .finish_non_exhaustive()
    }
}

impl Proj4Transform {
    /// Build a transform from `source_definition` into `destination`.
    ///
    /// # Errors
    /// Returns [`CrsError`] when either side cannot be interpreted.
    pub fn new(source_definition: &str, destination: &DestinationCrs) -> Result<Self, CrsError> {
        let source_string = to_proj_string(source_definition)?;
        debug!("source projection resolved to {source_string}");
        Ok(Self {
            source: build(&source_string)?,
            destination: build(destination.proj_string())?,
            source_geographic: is_geographic(&source_string),
            destination_geographic: is_geographic(destination.proj_string()),
        })
    }

    /// Map a coordinate from the destination CRS back to the source CRS.
    ///
    /// # Errors
    /// Returns [`ProjectionError`] when the coordinate cannot be projected.
    pub fn inverse(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        run(
            (&self.destination, self.destination_geographic),
            (&self.source, self.source_geographic),
            coord,
        )
    }
}

impl CoordTransform for Proj4Transform {
    fn forward(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        run(
            (&self.source, self.source_geographic),
            (&self.destination, self.destination_geographic),
            coord,
        )
    }
}

fn run(
    (from, from_geographic): (&Proj, bool),
    (to, to_geographic): (&Proj, bool),
    coord: Coord<f64>,
) -> Result<Coord<f64>, ProjectionError> {
    let mut point = if from_geographic {
        (coord.x.to_radians(), coord.y.to_radians(), 0.0)
    } else {
        (coord.x, coord.y, 0.0)
    };
    proj4rs::transform::transform(from, to, &mut point)
        .map_err(|err| ProjectionError::new(err.to_string()))?;
    let (x, y, _) = point;
    let projected = if to_geographic {
        Coord {
            x: x.to_degrees(),
            y: y.to_degrees(),
        }
    } else {
        Coord { x, y }
    };
    if projected.x.is_finite() && projected.y.is_finite() {
        Ok(projected)
    } else {
        Err(ProjectionError::new(format!(
            "({}, {}) has no finite projection",
            coord.x, coord.y
        )))
    }
}

/// Outcome of resolving a shapefile's source projection.
#[derive(Debug)]
pub struct ResolvedProjection {
    /// Transform from the source CRS into the destination CRS.
    pub transform: Proj4Transform,
    /// Set when the default source CRS was assumed.
    pub warning: Option<IngestWarning>,
}

/// Resolve the transform for a shapefile.
///
/// A missing or unparsable source definition falls back to
/// [`DEFAULT_SOURCE_CRS`] with a warning, so a source problem never fails.
///
/// # Errors
/// Returns [`CrsError`] only when the fallback transform itself cannot be
/// built for `destination`.
pub fn resolve(
    proj_definition: Option<&str>,
    destination: &DestinationCrs,
) -> Result<ResolvedProjection, CrsError> {
    let attempt = proj_definition.map_or(
        Err(DefaultProjectionReason::MissingDefinition),
        |definition| {
            Proj4Transform::new(definition, destination)
                .map_err(|err| DefaultProjectionReason::Unparsable(err.to_string()))
        },
    );
    match attempt {
        Ok(transform) => Ok(ResolvedProjection {
            transform,
            warning: None,
        }),
        Err(reason) => assume_default(reason, destination),
    }
}

/// Fall back to [`DEFAULT_SOURCE_CRS`], recording `reason` as a warning.
///
/// # Errors
/// Returns [`CrsError`] when the fallback transform cannot be built for
/// `destination`.
pub fn assume_default(
    reason: DefaultProjectionReason,
    destination: &DestinationCrs,
) -> Result<ResolvedProjection, CrsError> {
    let warning = IngestWarning::DefaultProjectionAssumed {
        default_crs: DEFAULT_SOURCE_CRS.to_owned(),
        reason,
    };
    warn!("{warning}");
    Ok(ResolvedProjection {
        transform: Proj4Transform::new(DEFAULT_SOURCE_CRS, destination)?,
        warning: Some(warning),
    })
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "assertions compare projected values within tolerances"
)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn wgs84_to_web_mercator() -> Proj4Transform {
        Proj4Transform::new("EPSG:4326", &DestinationCrs::default()).expect("valid transform")
    }

    #[rstest]
    fn projects_degrees_into_metres(wgs84_to_web_mercator: Proj4Transform) {
        let projected = wgs84_to_web_mercator
            .forward(Coord { x: -93.0, y: 45.0 })
            .expect("projects");
        assert!((projected.x + 10_352_712.643).abs() < 0.01, "{projected:?}");
        assert!((projected.y - 5_621_521.486).abs() < 0.01, "{projected:?}");
    }

    #[rstest]
    fn inverse_returns_to_degrees(wgs84_to_web_mercator: Proj4Transform) {
        let original = Coord { x: 151.2093, y: -33.8688 };
        let projected = wgs84_to_web_mercator.forward(original).expect("projects");
        let back = wgs84_to_web_mercator.inverse(projected).expect("inverts");
        assert!((back.x - original.x).abs() < 1e-9);
        assert!((back.y - original.y).abs() < 1e-9);
    }

    #[rstest]
    #[case::proj("+proj=longlat +datum=WGS84 +no_defs", true)]
    #[case::epsg("EPSG:4326", true)]
    #[case::lowercase_epsg("epsg:3857", false)]
    fn recognises_definition_syntaxes(#[case] definition: &str, #[case] geographic: bool) {
        let proj = to_proj_string(definition).expect("recognised");
        assert_eq!(is_geographic(&proj), geographic);
    }

    #[rstest]
    #[case::blank("  ", CrsError::Empty)]
    #[case::unknown_code("EPSG:1", CrsError::UnknownEpsg { code: "1".to_owned() })]
    #[case::prose("my projection", CrsError::Unrecognised { definition: "my projection".to_owned() })]
    fn rejects_uninterpretable_definitions(#[case] definition: &str, #[case] expected: CrsError) {
        assert_eq!(to_proj_string(definition), Err(expected));
    }

    #[rstest]
    fn missing_definition_assumes_default() {
        let resolved = resolve(None, &DestinationCrs::default()).expect("default builds");
        assert_eq!(
            resolved.warning,
            Some(IngestWarning::DefaultProjectionAssumed {
                default_crs: DEFAULT_SOURCE_CRS.to_owned(),
                reason: DefaultProjectionReason::MissingDefinition,
            })
        );
        let same = resolved
            .transform
            .forward(Coord { x: 1000.0, y: -2000.0 })
            .expect("identity");
        assert!((same.x - 1000.0).abs() < 1e-6);
        assert!((same.y + 2000.0).abs() < 1e-6);
    }

    #[rstest]
    fn unparsable_definition_assumes_default() {
        let resolved =
            resolve(Some("GEOGCS[broken"), &DestinationCrs::default()).expect("default builds");
        assert!(matches!(
            resolved.warning,
            Some(IngestWarning::DefaultProjectionAssumed {
                reason: DefaultProjectionReason::Unparsable(_),
                ..
            })
        ));
    }

    #[rstest]
    fn known_definition_has_no_warning() {
        let resolved = resolve(Some("EPSG:4326"), &DestinationCrs::default()).expect("resolves");
        assert!(resolved.warning.is_none());
    }
}
