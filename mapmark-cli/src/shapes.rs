//! Shapes command implementation for the mapmark CLI.

use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Args, Parser};
use mapmark_core::Shapefile;
use mapmark_data::{DestinationCrs, IngestFailure, discover_shapefiles, ingest_shapefiles};
use mapmark_fs::CapFolder;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::error::describe_chain;
use crate::{ARG_DEST_CRS, ARG_FOLDER, CliError, ENV_SHAPES_FOLDER, geojson, runtime};

/// CLI arguments for the `shapes` subcommand.
#[derive(Debug, Args)]
#[command(
    long_about = "Ingest the shapefiles in a folder, join each shape with its \
                 attribute row and reproject it into the destination CRS. \
                 The folder and CRS can come from CLI flags, configuration \
                 files, or environment variables.",
    about = "Ingest and reproject shapefiles"
)]
pub(crate) struct ShapesCommand {
    #[command(flatten)]
    pub(crate) args: ShapesArgs,
    /// Print one GeoJSON FeatureCollection per shapefile instead of a summary.
    #[arg(long)]
    pub(crate) geojson: bool,
    /// Shapefiles to ingest; every `.shp` in the folder when omitted.
    #[arg(value_name = "name")]
    pub(crate) names: Vec<String>,
}

/// Layered settings for the `shapes` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "shapes")]
#[ortho_config(prefix = "MAPMARK")]
pub(crate) struct ShapesArgs {
    /// Folder holding the shapefiles and their companions.
    #[arg(long = ARG_FOLDER, value_name = "dir")]
    #[serde(default)]
    pub(crate) folder: Option<Utf8PathBuf>,
    /// Destination CRS as an EPSG code or PROJ.4 string (default EPSG:3857).
    #[arg(long = ARG_DEST_CRS, value_name = "crs")]
    #[serde(default)]
    pub(crate) dest_crs: Option<String>,
}

impl ShapesArgs {
    pub(crate) fn into_config(self) -> Result<ShapesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ShapesConfig::try_from(merged)
    }
}

/// Resolved `shapes` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct ShapesConfig {
    /// Folder holding the shapefiles.
    pub(crate) folder: Utf8PathBuf,
    /// Projection every geometry is transformed into.
    pub(crate) destination: DestinationCrs,
}

impl TryFrom<ShapesArgs> for ShapesConfig {
    type Error = CliError;

    fn try_from(args: ShapesArgs) -> Result<Self, Self::Error> {
        let folder = args.folder.ok_or(CliError::MissingArgument {
            field: ARG_FOLDER,
            env: ENV_SHAPES_FOLDER,
        })?;
        let destination = match args.dest_crs {
            Some(identifier) => DestinationCrs::parse(&identifier)
                .map_err(|source| CliError::DestinationCrs { identifier, source })?,
            None => DestinationCrs::default(),
        };
        Ok(Self {
            folder,
            destination,
        })
    }
}

pub(super) fn run_shapes(command: ShapesCommand) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_shapes_with(command, &mut stdout)
}

pub(super) fn run_shapes_with(
    command: ShapesCommand,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = command.args.into_config()?;
    execute_shapes(&config, command.geojson, command.names, writer)
}

pub(super) fn execute_shapes(
    config: &ShapesConfig,
    geojson: bool,
    names: Vec<String>,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let folder = CapFolder::open(&config.folder).map_err(|source| CliError::OpenFolder {
        path: config.folder.clone(),
        source,
    })?;
    let names = if names.is_empty() {
        discover_shapefiles(&folder).map_err(|source| CliError::ListFolder {
            path: config.folder.clone(),
            source,
        })?
    } else {
        names
    };
    let total = names.len();
    log::debug!("ingesting {total} shapefiles from {}", config.folder);

    let set = runtime()?.block_on(ingest_shapefiles(
        Arc::new(folder),
        names,
        config.destination.clone(),
    ));
    for shapefile in &set.shapefiles {
        if geojson {
            write_geojson(writer, shapefile)?;
        } else {
            write_summary(writer, shapefile)?;
        }
    }
    for failure in &set.failures {
        write_failure(writer, failure)?;
    }

    if set.failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::ShapefilesFailed {
            failed: set.failures.len(),
            total,
        })
    }
}

fn write_summary(writer: &mut dyn Write, shapefile: &Shapefile) -> Result<(), CliError> {
    writeln!(
        writer,
        "{}: {} features, fields [{}]",
        shapefile.name(),
        shapefile.len(),
        shapefile.field_names().join(", ")
    )
    .map_err(CliError::WriteOutput)?;
    for warning in shapefile.warnings() {
        writeln!(writer, "  warning: {warning}").map_err(CliError::WriteOutput)?;
    }
    Ok(())
}

fn write_geojson(writer: &mut dyn Write, shapefile: &Shapefile) -> Result<(), CliError> {
    let payload = serde_json::to_string(&geojson::feature_collection(shapefile))
        .map_err(CliError::SerialiseGeoJson)?;
    writeln!(writer, "{payload}").map_err(CliError::WriteOutput)
}

fn write_failure(writer: &mut dyn Write, failure: &IngestFailure) -> Result<(), CliError> {
    writeln!(writer, "{}", describe_chain(failure)).map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ShapesConfig, CliError> {
    let merged = ShapesArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ShapesConfig::try_from(merged)
}
