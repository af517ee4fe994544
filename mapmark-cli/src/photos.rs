//! Photo listing and geotagging commands.

use std::io::Write;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use mapmark_core::GpsPosition;
use mapmark_data::{PhotoGeotag, PhotoRecord, load_geotags_concurrently, save_geotag};
use mapmark_fs::CapFolder;

use crate::error::describe_chain;
use crate::{ARG_FOLDER, CliError, runtime};

/// CLI arguments for the `photos` subcommand.
#[derive(Debug, Clone, Args)]
pub(crate) struct PhotosArgs {
    /// Folder holding the photos.
    #[arg(long = ARG_FOLDER, value_name = "dir")]
    pub(crate) folder: Utf8PathBuf,
}

/// CLI arguments for the `geotag` subcommand.
#[derive(Debug, Clone, Args)]
#[command(allow_negative_numbers = true)]
pub(crate) struct GeotagArgs {
    /// Folder holding the photo.
    #[arg(long = ARG_FOLDER, value_name = "dir")]
    pub(crate) folder: Utf8PathBuf,
    /// File name of the photo within the folder.
    #[arg(long, value_name = "name")]
    pub(crate) photo: String,
    /// Latitude in signed decimal degrees.
    #[arg(long, value_name = "degrees")]
    pub(crate) lat: f64,
    /// Longitude in signed decimal degrees.
    #[arg(long, value_name = "degrees")]
    pub(crate) lon: f64,
}

fn open_folder(path: &Utf8Path) -> Result<CapFolder, CliError> {
    CapFolder::open(path).map_err(|source| CliError::OpenFolder {
        path: path.to_path_buf(),
        source,
    })
}

pub(super) fn run_photos(args: &PhotosArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_photos_with(args, &mut stdout)
}

pub(super) fn run_photos_with(args: &PhotosArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let folder = Arc::new(open_folder(&args.folder)?);
    let records = runtime()?
        .block_on(load_geotags_concurrently(folder))
        .map_err(|source| CliError::ListFolder {
            path: args.folder.clone(),
            source,
        })?;
    for record in &records {
        write_record(writer, record)?;
    }
    Ok(())
}

fn write_record(writer: &mut dyn Write, record: &PhotoRecord) -> Result<(), CliError> {
    let status = match &record.geotag {
        PhotoGeotag::Located(position) => {
            format!("{:.6}, {:.6}", position.latitude, position.longitude)
        }
        PhotoGeotag::MissingGps => "missing GPS".to_owned(),
        PhotoGeotag::Failed(err) => describe_chain(err),
    };
    writeln!(writer, "{}: {status}", record.name).map_err(CliError::WriteOutput)
}

pub(super) fn run_geotag(args: &GeotagArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_geotag_with(args, &mut stdout)
}

pub(super) fn run_geotag_with(args: &GeotagArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let folder = open_folder(&args.folder)?;
    let position = GpsPosition::new(args.lat, args.lon);
    save_geotag(&folder, &args.photo, position).map_err(|source| CliError::Geotag {
        photo: args.photo.clone(),
        source,
    })?;
    writeln!(
        writer,
        "{}: {:.6}, {:.6}",
        args.photo, position.latitude, position.longitude
    )
    .map_err(CliError::WriteOutput)
}
