//! Command-line interface for mapmark's shapefile and photo tooling.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod geojson;
mod photos;
mod shapes;

pub use error::CliError;

use photos::{GeotagArgs, PhotosArgs};
use shapes::ShapesCommand;

const ARG_FOLDER: &str = "folder";
const ARG_DEST_CRS: &str = "dest-crs";
const ENV_SHAPES_FOLDER: &str = "MAPMARK_CMDS_SHAPES_FOLDER";

/// Run the mapmark CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Shapes(command) => shapes::run_shapes(command),
        Command::Photos(args) => photos::run_photos(&args),
        Command::Geotag(args) => photos::run_geotag(&args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "mapmark",
    about = "Inspect shapefiles and geotag photos in a folder",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ingest shapefiles and reproject them into a destination CRS.
    Shapes(ShapesCommand),
    /// List the GPS position recorded in each photo.
    Photos(PhotosArgs),
    /// Write a GPS position into a photo.
    Geotag(GeotagArgs),
}

fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)
}

#[cfg(test)]
mod tests;
