//! Error types emitted by the mapmark CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mapmark_data::{CrsError, PhotoError};
use thiserror::Error;

/// Errors emitted by the mapmark CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// The destination CRS could not be interpreted.
    #[error("invalid destination CRS {identifier:?}: {source}")]
    DestinationCrs {
        /// Identifier as configured.
        identifier: String,
        /// Resolution failure.
        #[source]
        source: CrsError,
    },
    /// The folder could not be opened.
    #[error("failed to open folder {path:?}: {source}")]
    OpenFolder {
        /// Folder path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The folder could not be listed.
    #[error("failed to list folder {path:?}: {source}")]
    ListFolder {
        /// Folder path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// One or more shapefiles failed to ingest.
    #[error("{failed} of {total} shapefiles failed to ingest")]
    ShapefilesFailed {
        /// Number of failures.
        failed: usize,
        /// Number of shapefiles requested.
        total: usize,
    },
    /// Writing a photo's new position failed.
    #[error("failed to geotag {photo}: {source}")]
    Geotag {
        /// Photo file name.
        photo: String,
        /// Photo failure.
        #[source]
        source: PhotoError,
    },
    /// Serialising GeoJSON output failed.
    #[error("failed to serialise GeoJSON: {0}")]
    SerialiseGeoJson(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

/// Render `err` followed by each of its sources, separated by `: `.
pub(crate) fn describe_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(source) = cause {
        message.push_str(": ");
        message.push_str(&source.to_string());
        cause = source.source();
    }
    message
}
