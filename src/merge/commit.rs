//! Temporary output and the final atomic install at the destination path.

use std::fs::{self, File, Permissions};
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::error::{MergeError, Result};

/// Identity of a file on disk, used to tell whether two paths name the same file.
#[cfg(unix)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

#[cfg(not(unix))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId {
    canonical: PathBuf,
}

impl FileId {
    #[cfg(unix)]
    pub fn of(_path: &Path, meta: &fs::Metadata) -> io::Result<Self> {
        Ok(Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(path: &Path, _meta: &fs::Metadata) -> io::Result<Self> {
        Ok(Self {
            canonical: fs::canonicalize(path)?,
        })
    }

    /// Identity of whatever is at `path` now, `None` if nothing is.
    pub fn probe(path: &Path) -> io::Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) => Self::of(path, &meta).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Directory that will hold the temporary file for `destination`.
fn parent_dir(destination: &Path) -> &Path {
    match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Merge output that is not yet visible at its destination.
///
/// Data goes to a temporary file next to the destination. Dropping a
/// `PendingOutput` without committing removes that file and leaves the
/// destination untouched.
pub struct PendingOutput {
    temp: NamedTempFile,
    destination: PathBuf,
    /// What occupied the destination when the merge began.
    original: Option<FileId>,
}

impl PendingOutput {
    pub fn create(destination: &Path) -> Result<Self> {
        let original =
            FileId::probe(destination).map_err(|e| MergeError::file(destination, e))?;
        let dir = parent_dir(destination);
        let temp = tempfile::Builder::new()
            .prefix(".fmerge-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| MergeError::file(dir, e))?;
        debug!(
            temp = %temp.path().display(),
            destination = %destination.display(),
            replacing = original.is_some(),
            "temporary output created"
        );
        Ok(Self {
            temp,
            destination: destination.to_path_buf(),
            original,
        })
    }

    /// Path of the temporary file.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Handle to write the merge into.
    pub fn file(&self) -> &File {
        self.temp.as_file()
    }

    /// Sync the temporary file, apply `permissions`, and rename it over the
    /// destination.
    ///
    /// The rename never clobbers a file that appeared, or was swapped in,
    /// after the merge began: an absent destination must still be absent
    /// (no-clobber rename) and a present one must still be the same file.
    /// Otherwise the result is discarded with `DestinationConflict`.
    pub fn commit(self, permissions: Option<Permissions>) -> Result<()> {
        let PendingOutput {
            temp,
            destination,
            original,
        } = self;

        temp.as_file()
            .sync_all()
            .map_err(|e| MergeError::file(temp.path(), e))?;
        if let Some(permissions) = permissions {
            temp.as_file()
                .set_permissions(permissions)
                .map_err(|e| MergeError::file(temp.path(), e))?;
        }

        let current =
            FileId::probe(&destination).map_err(|e| MergeError::file(&destination, e))?;
        match (original, current) {
            (_, None) => {
                temp.persist_noclobber(&destination).map_err(|e| {
                    if e.error.kind() == io::ErrorKind::AlreadyExists {
                        MergeError::DestinationConflict(destination.clone())
                    } else {
                        MergeError::file(&destination, e.error)
                    }
                })?;
            }
            (Some(before), Some(now)) if before == now => {
                temp.persist(&destination)
                    .map_err(|e| MergeError::file(&destination, e.error))?;
            }
            (_, Some(_)) => return Err(MergeError::DestinationConflict(destination)),
        }

        info!(destination = %destination.display(), "merge committed");
        Ok(())
    }
}
