//! Loading and saving photo geotags.
//!
//! Photos are the `.jpg` and `.jpeg` files of a [`Folder`], matched without
//! regard to case. Saving goes through [`Folder::replace`], so the new image
//! is fully encoded before the old one is touched.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use futures_util::future::join_all;
use log::{debug, warn};
use mapmark_core::GpsPosition;
use mapmark_exif::{ExifError, read_gps, write_gps};
use mapmark_fs::Folder;
use thiserror::Error;

const PHOTO_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

/// Errors raised while loading or saving a photo.
#[derive(Debug, Error)]
pub enum PhotoError {
    /// The photo could not be read.
    #[error("failed to read photo")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The photo's EXIF data could not be decoded or re-encoded.
    #[error("EXIF processing failed")]
    Exif {
        /// Codec failure.
        #[from]
        source: ExifError,
    },
    /// The updated photo could not be written back.
    #[error("failed to replace photo")]
    Replace {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The photo task did not complete.
    #[error("photo task failed: {message}")]
    Task {
        /// Join error reported by the runtime.
        message: String,
    },
}

/// Load status of one photo.
#[derive(Debug)]
pub enum PhotoGeotag {
    /// The photo carries a GPS position.
    Located(GpsPosition),
    /// The photo has no usable GPS position.
    MissingGps,
    /// The photo could not be read or decoded.
    Failed(PhotoError),
}

impl PhotoGeotag {
    /// The position, when the photo has one.
    #[must_use]
    pub const fn position(&self) -> Option<GpsPosition> {
        match self {
            Self::Located(position) => Some(*position),
            Self::MissingGps | Self::Failed(_) => None,
        }
    }
}

/// A photo name paired with its load status.
#[derive(Debug)]
pub struct PhotoRecord {
    /// File name within the folder.
    pub name: String,
    /// Load status.
    pub geotag: PhotoGeotag,
}

/// Whether `name` has a JPEG extension.
#[must_use]
pub fn is_photo_name(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(stem, extension)| {
        !stem.is_empty()
            && PHOTO_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
    })
}

/// Photo file names in `folder`, sorted.
///
/// # Errors
/// Returns the underlying I/O error when the folder cannot be listed.
pub fn discover_photos<F: Folder + ?Sized>(folder: &F) -> io::Result<Vec<String>> {
    Ok(folder
        .file_names()?
        .into_iter()
        .filter(|name| is_photo_name(name))
        .collect())
}

/// Read the GPS position of one photo.
#[must_use]
pub fn load_geotag<F: Folder + ?Sized>(folder: &F, name: &str) -> PhotoGeotag {
    let bytes = match folder.read(name) {
        Ok(bytes) => bytes,
        Err(source) => return PhotoGeotag::Failed(PhotoError::Read { source }),
    };
    match read_gps(&bytes) {
        Ok(Some(position)) => PhotoGeotag::Located(position),
        Ok(None) => {
            warn!("image {name} won't render because it is missing exif data");
            PhotoGeotag::MissingGps
        }
        Err(err) => {
            warn!("image {name} could not be decoded: {err}");
            PhotoGeotag::Failed(err.into())
        }
    }
}

/// Read the GPS position of every photo in `folder`.
///
/// # Errors
/// Returns the underlying I/O error when the folder cannot be listed.
pub fn load_geotags<F: Folder + ?Sized>(folder: &F) -> io::Result<Vec<PhotoRecord>> {
    Ok(discover_photos(folder)?
        .into_iter()
        .map(|name| {
            let geotag = load_geotag(folder, &name);
            PhotoRecord { name, geotag }
        })
        .collect())
}

/// Read the GPS position of every photo in `folder`, one task per photo.
///
/// # Errors
/// Returns the underlying I/O error when the folder cannot be listed.
pub async fn load_geotags_concurrently<F>(folder: Arc<F>) -> io::Result<Vec<PhotoRecord>>
where
    F: Folder + ?Sized + 'static,
{
    let names = discover_photos(folder.as_ref())?;
    let tasks = names.into_iter().map(|name| {
        let task_folder = Arc::clone(&folder);
        async move {
            let task_name = name.clone();
            let geotag = tokio::task::spawn_blocking(move || {
                load_geotag(task_folder.as_ref(), &task_name)
            })
            .await
            .unwrap_or_else(|err| {
                PhotoGeotag::Failed(PhotoError::Task {
                    message: err.to_string(),
                })
            });
            PhotoRecord { name, geotag }
        }
    });
    Ok(join_all(tasks).await)
}

/// Write a new GPS position into one photo.
///
/// # Errors
/// Returns [`PhotoError`] when the photo cannot be read, re-encoded or
/// written back. The original file is unchanged on failure.
pub fn save_geotag<F: Folder + ?Sized>(
    folder: &F,
    name: &str,
    position: GpsPosition,
) -> Result<(), PhotoError> {
    let bytes = folder
        .read(name)
        .map_err(|source| PhotoError::Read { source })?;
    let tagged = write_gps(&bytes, position.latitude, position.longitude)?;
    folder
        .replace(name, &tagged)
        .map_err(|source| PhotoError::Replace { source })?;
    debug!("saved geotag for {name}");
    Ok(())
}

/// Outcome of saving one photo in a batch.
#[derive(Debug)]
pub struct SaveOutcome {
    /// File name within the folder.
    pub name: String,
    /// Whether the save succeeded.
    pub result: Result<(), PhotoError>,
}

/// Save a batch of edits, one task per photo.
///
/// Edits are keyed by photo name; when a name appears more than once the
/// last edit wins, so no two tasks write the same file. Outcomes are sorted
/// by name.
pub async fn save_geotags<F, I>(folder: Arc<F>, edits: I) -> Vec<SaveOutcome>
where
    F: Folder + ?Sized + 'static,
    I: IntoIterator<Item = (String, GpsPosition)>,
{
    let latest: BTreeMap<String, GpsPosition> = edits.into_iter().collect();
    let tasks = latest.into_iter().map(|(name, position)| {
        let task_folder = Arc::clone(&folder);
        async move {
            let task_name = name.clone();
            let result = tokio::task::spawn_blocking(move || {
                save_geotag(task_folder.as_ref(), &task_name, position)
            })
            .await
            .unwrap_or_else(|err| {
                Err(PhotoError::Task {
                    message: err.to_string(),
                })
            });
            if let Err(err) = &result {
                warn!("failed to save geotag for {name}: {err}");
            }
            SaveOutcome { name, result }
        }
    });
    join_all(tasks).await
}
