//! Shapefile ingestion.
//!
//! A shapefile is read from a [`Folder`] as `<name>.shp` plus the optional
//! `<name>.prj` and `<name>.dbf` companions. Geometries are reprojected into
//! the destination CRS and paired with attribute rows by record position.

pub mod dbf;
mod rings;
pub mod shp;

use std::io;
use std::sync::Arc;

use futures_util::future::join_all;
use log::{debug, warn};
use mapmark_core::{
    AttributeRow, DefaultProjectionReason, Feature, IngestWarning, ReprojectError, Shapefile,
    reproject,
};
use mapmark_fs::Folder;
use thiserror::Error;

use self::dbf::{DbfError, DbfTable, parse_dbf};
use self::shp::{ShpError, parse_shp, shape_type_name};
use crate::projection::{CrsError, DestinationCrs, assume_default, resolve};

const SHP_EXTENSION: &str = ".shp";

/// Why a shapefile could not be ingested.
#[derive(Debug, Error)]
pub enum IngestCause {
    /// `<name>.shp` is not in the folder.
    #[error("shape file not found")]
    MissingShapeFile,
    /// `<name>.shp` exists but could not be read.
    #[error("failed to read shape file")]
    ReadShapeFile {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The shape file is corrupt.
    #[error("invalid shape data")]
    ShapeFormat {
        /// Decoder failure.
        #[source]
        source: ShpError,
    },
    /// A record uses a geometry type that cannot be ingested.
    #[error("bad shape type: {kind}")]
    UnsupportedGeometryType {
        /// Name of the offending type.
        kind: String,
    },
    /// `<name>.dbf` exists but could not be read.
    #[error("failed to read attribute table")]
    ReadAttributes {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The attribute table is corrupt.
    #[error("invalid attribute table")]
    AttributeFormat {
        /// Decoder failure.
        #[source]
        source: DbfError,
    },
    /// Shape and attribute records cannot be paired by position.
    #[error("{shapes} shape records but {records} attribute records")]
    AttributeCountMismatch {
        /// Number of shape records.
        shapes: usize,
        /// Number of attribute records.
        records: usize,
    },
    /// A geometry could not be reprojected.
    #[error("failed to reproject geometry")]
    Projection {
        /// Reprojection failure.
        #[source]
        source: ReprojectError,
    },
    /// No transform into the destination CRS could be built.
    #[error("failed to prepare projection")]
    Crs {
        /// Resolution failure.
        #[source]
        source: CrsError,
    },
    /// The ingestion task did not complete.
    #[error("ingestion task failed: {message}")]
    Task {
        /// Join error reported by the runtime.
        message: String,
    },
}

/// A shapefile that could not be ingested.
#[derive(Debug, Error)]
#[error("failed to ingest shapefile {shapefile_name}")]
pub struct IngestFailure {
    /// Requested name, without the `.shp` extension.
    pub shapefile_name: String,
    /// What went wrong.
    #[source]
    pub cause: IngestCause,
}

/// Strip a trailing `.shp` from a requested name.
#[must_use]
pub fn shapefile_stem(name: &str) -> &str {
    name.strip_suffix(SHP_EXTENSION).unwrap_or(name)
}

/// Basenames of the `.shp` files in `folder`, sorted.
///
/// # Errors
/// Returns the underlying I/O error when the folder cannot be listed.
pub fn discover_shapefiles<F: Folder + ?Sized>(folder: &F) -> io::Result<Vec<String>> {
    Ok(folder
        .file_names()?
        .iter()
        .filter_map(|file| file.strip_suffix(SHP_EXTENSION))
        .filter(|stem| !stem.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Ingest one shapefile into `destination`.
///
/// Missing or unusable `.prj` and `.dbf` companions degrade to warnings on
/// the returned [`Shapefile`]; anything else fails the whole file so no
/// partial result escapes.
///
/// # Errors
/// Returns [`IngestFailure`] naming the shapefile and the cause.
pub fn ingest_shapefile<F: Folder + ?Sized>(
    folder: &F,
    name: &str,
    destination: &DestinationCrs,
) -> Result<Shapefile, IngestFailure> {
    let stem = shapefile_stem(name);
    load(folder, stem, destination).map_err(|cause| IngestFailure {
        shapefile_name: stem.to_owned(),
        cause,
    })
}

fn load<F: Folder + ?Sized>(
    folder: &F,
    stem: &str,
    destination: &DestinationCrs,
) -> Result<Shapefile, IngestCause> {
    let shape_bytes = folder
        .read(&format!("{stem}.shp"))
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => IngestCause::MissingShapeFile,
            _ => IngestCause::ReadShapeFile { source },
        })?;

    let mut warnings = Vec::new();
    let resolved = match read_projection(folder, stem) {
        Ok(definition) => resolve(definition.as_deref(), destination),
        Err(err) => assume_default(
            DefaultProjectionReason::Unreadable(err.to_string()),
            destination,
        ),
    }
    .map_err(|source| IngestCause::Crs { source })?;
    warnings.extend(resolved.warning);

    let shapes = parse_shp(&shape_bytes).map_err(|source| match source {
        ShpError::UnsupportedShapeType { code, .. } => IngestCause::UnsupportedGeometryType {
            kind: shape_type_name(code).to_owned(),
        },
        other => IngestCause::ShapeFormat { source: other },
    })?;
    debug!("{stem}.shp holds {} records", shapes.len());

    let (field_names, rows) = match read_attributes(folder, stem)? {
        Some(table) if table.rows.len() != shapes.len() => {
            return Err(IngestCause::AttributeCountMismatch {
                shapes: shapes.len(),
                records: table.rows.len(),
            });
        }
        Some(DbfTable { schema, rows }) => (schema.to_vec(), rows),
        None => {
            warn!("file {stem}.dbf not found, metadata missing");
            warnings.push(IngestWarning::MissingAttributes);
            let rows = shapes.iter().map(|_| AttributeRow::empty()).collect();
            (Vec::new(), rows)
        }
    };

    let mut features = Vec::with_capacity(shapes.len());
    for (record, (shape, attributes)) in shapes.into_iter().zip(rows).enumerate() {
        let Some(source_geometry) = shape else {
            let warning = IngestWarning::NullGeometrySkipped { record };
            warn!("{stem}: {warning}");
            warnings.push(warning);
            continue;
        };
        let geometry = reproject(source_geometry, &resolved.transform)
            .map_err(|source| IngestCause::Projection { source })?;
        features.push(Feature {
            geometry,
            attributes,
        });
    }
    Ok(Shapefile::new(
        stem.to_owned(),
        features,
        field_names,
        warnings,
    ))
}

fn read_projection<F: Folder + ?Sized>(folder: &F, stem: &str) -> io::Result<Option<String>> {
    match folder.read(&format!("{stem}.prj")) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

fn read_attributes<F: Folder + ?Sized>(
    folder: &F,
    stem: &str,
) -> Result<Option<DbfTable>, IngestCause> {
    match folder.read(&format!("{stem}.dbf")) {
        Ok(bytes) => parse_dbf(&bytes)
            .map(Some)
            .map_err(|source| IngestCause::AttributeFormat { source }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(IngestCause::ReadAttributes { source }),
    }
}

/// Outcome of a batch ingestion.
#[derive(Debug, Default)]
pub struct ShapefileSet {
    /// Ingested shapefiles in request order.
    pub shapefiles: Vec<Shapefile>,
    /// Every attribute field name, deduplicated in first-seen order.
    pub field_names: Vec<String>,
    /// Shapefiles that failed, in request order.
    pub failures: Vec<IngestFailure>,
}

impl ShapefileSet {
    /// Partition per-file results, aggregating field names.
    #[must_use]
    pub fn from_results(results: Vec<Result<Shapefile, IngestFailure>>) -> Self {
        let mut set = Self::default();
        for result in results {
            match result {
                Ok(shapefile) => {
                    for field in shapefile.field_names() {
                        if !set.field_names.contains(field) {
                            set.field_names.push(field.clone());
                        }
                    }
                    set.shapefiles.push(shapefile);
                }
                Err(failure) => set.failures.push(failure),
            }
        }
        set
    }

    /// Look up an ingested shapefile by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Shapefile> {
        self.shapefiles
            .iter()
            .find(|shapefile| shapefile.name() == name)
    }
}

/// Ingest several shapefiles concurrently.
///
/// Each name runs on its own blocking task; one failure never affects the
/// others.
pub async fn ingest_shapefiles<F>(
    folder: Arc<F>,
    names: Vec<String>,
    destination: DestinationCrs,
) -> ShapefileSet
where
    F: Folder + ?Sized + 'static,
{
    let tasks = names.into_iter().map(|name| {
        let task_folder = Arc::clone(&folder);
        let task_destination = destination.clone();
        async move {
            let stem = shapefile_stem(&name).to_owned();
            tokio::task::spawn_blocking(move || {
                ingest_shapefile(task_folder.as_ref(), &name, &task_destination)
            })
            .await
            .unwrap_or_else(|err| {
                Err(IngestFailure {
                    shapefile_name: stem,
                    cause: IngestCause::Task {
                        message: err.to_string(),
                    },
                })
            })
        }
    });
    ShapefileSet::from_results(join_all(tasks).await)
}
