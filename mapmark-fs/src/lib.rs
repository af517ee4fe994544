//! Folder access for photo and shapefile collections.
//!
//! A [`Folder`] is a flat set of named files. [`CapFolder`] scopes access to
//! one directory through `cap-std`, so a file name can never reach outside
//! it. [`MemoryFolder`] keeps files in memory for tests and embedders.
#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, RwLock};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use log::{debug, warn};

/// Suffix of the staging file written by [`CapFolder::replace`].
pub const STAGING_SUFFIX: &str = ".mapmark-tmp";

/// A flat collection of named files.
pub trait Folder: Send + Sync {
    /// Names of the regular files in the folder, sorted.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the folder cannot be listed.
    fn file_names(&self) -> io::Result<Vec<String>>;

    /// Read the whole of `name`.
    ///
    /// # Errors
    /// Returns [`io::ErrorKind::NotFound`] when no such file exists.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Replace the contents of `name` with `bytes`.
    ///
    /// The new bytes are fully buffered before the file is swapped, so a
    /// failed replacement leaves the original intact.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the write or swap fails.
    fn replace(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    /// Whether `name` exists as a regular file.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the folder cannot be listed.
    fn contains(&self, name: &str) -> io::Result<bool> {
        Ok(self.file_names()?.iter().any(|file| file == name))
    }
}

impl<T: Folder + ?Sized> Folder for Arc<T> {
    fn file_names(&self) -> io::Result<Vec<String>> {
        (**self).file_names()
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        (**self).read(name)
    }

    fn replace(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        (**self).replace(name, bytes)
    }

    fn contains(&self, name: &str) -> io::Result<bool> {
        (**self).contains(name)
    }
}

fn check_name(name: &str) -> io::Result<()> {
    let mut components = Utf8Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(camino::Utf8Component::Normal(_)), None) => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{name:?} is not a plain file name"),
        )),
    }
}

/// A directory opened with capability-scoped access.
#[derive(Debug)]
pub struct CapFolder {
    dir: fs_utf8::Dir,
    path: Utf8PathBuf,
}

impl CapFolder {
    /// Open the directory at `path` using ambient authority.
    ///
    /// # Errors
    /// Returns the underlying I/O error when the directory cannot be opened.
    pub fn open(path: &Utf8Path) -> io::Result<Self> {
        let dir = fs_utf8::Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self {
            dir,
            path: path.to_path_buf(),
        })
    }

    /// Path the folder was opened from.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Folder for CapFolder {
    fn file_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for item in self.dir.entries()? {
            let entry = item?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name()?);
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        check_name(name)?;
        self.dir.read(name)
    }

    fn replace(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        check_name(name)?;
        let staging = format!("{name}{STAGING_SUFFIX}");
        self.dir.write(&staging, bytes)?;
        if let Err(err) = self.dir.rename(&staging, &self.dir, name) {
            if let Err(cleanup) = self.dir.remove_file(&staging) {
                warn!("failed to remove staging file {staging}: {cleanup}");
            }
            return Err(err);
        }
        debug!("replaced {} in {}", name, self.path);
        Ok(())
    }

    fn contains(&self, name: &str) -> io::Result<bool> {
        check_name(name)?;
        match self.dir.metadata(name) {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Files held in memory.
///
/// # Examples
///
/// ```
/// use mapmark_fs::{Folder, MemoryFolder};
///
/// # fn main() -> std::io::Result<()> {
/// let folder = MemoryFolder::new().with_file("roads.shp", vec![0; 4]);
/// assert_eq!(folder.file_names()?, ["roads.shp"]);
/// folder.replace("roads.shp", &[1, 2])?;
/// assert_eq!(folder.read("roads.shp")?, [1, 2]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryFolder {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryFolder {
    /// An empty folder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, consuming and returning the folder.
    #[must_use]
    pub fn with_file(self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        if let Ok(mut files) = self.files.write() {
            files.insert(name.into(), bytes);
        }
        self
    }

    fn poisoned() -> io::Error {
        io::Error::other("memory folder lock poisoned")
    }
}

impl Folder for MemoryFolder {
    fn file_names(&self) -> io::Result<Vec<String>> {
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        Ok(files.keys().cloned().collect())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let files = self.files.read().map_err(|_| Self::poisoned())?;
        files.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{name} not found"))
        })
    }

    fn replace(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        check_name(name)?;
        let mut files = self.files.write().map_err(|_| Self::poisoned())?;
        files.insert(name.to_owned(), bytes.to_vec());
        Ok(())
    }
}
