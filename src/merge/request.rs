use std::fs::{self, File, Permissions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::commit::{FileId, PendingOutput};
use super::core::{MergeOptions, MergeStats, merge_streams};
use super::error::{MergeError, Result, Source};

/// A merge of two sorted files into a destination path.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub first: PathBuf,
    pub second: PathBuf,
    pub destination: PathBuf,
    pub options: MergeOptions,
}

/// Outcome of a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Lines written, when counting was requested.
    pub lines_written: Option<u64>,
    pub stats: MergeStats,
}

impl MergeRequest {
    pub fn new(
        first: impl Into<PathBuf>,
        second: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        options: MergeOptions,
    ) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            destination: destination.into(),
            options,
        }
    }

    /// Check the request without opening any file. Returns the permissions of
    /// the first source, which the output inherits.
    pub fn validate(&self) -> Result<Permissions> {
        for (name, path) in [
            ("first input", &self.first),
            ("second input", &self.second),
            ("destination", &self.destination),
        ] {
            if path.as_os_str().is_empty() {
                return Err(MergeError::InvalidArguments(format!("empty {} path", name)));
            }
        }
        if self.options.window_size == 0 {
            return Err(MergeError::InvalidArguments(
                "buffer size must be greater than zero".to_string(),
            ));
        }

        let meta1 = source_metadata(&self.first)?;
        let meta2 = source_metadata(&self.second)?;
        let id1 = FileId::of(&self.first, &meta1).map_err(|e| MergeError::file(&self.first, e))?;
        let id2 =
            FileId::of(&self.second, &meta2).map_err(|e| MergeError::file(&self.second, e))?;
        if id1 == id2 {
            return Err(MergeError::InvalidArguments(format!(
                "'{}' and '{}' are the same file",
                self.first.display(),
                self.second.display()
            )));
        }

        match fs::metadata(&self.destination) {
            Ok(meta) => {
                if meta.is_dir() {
                    return Err(MergeError::InvalidArguments(format!(
                        "destination '{}' is a directory",
                        self.destination.display()
                    )));
                }
                if !meta.is_file() {
                    return Err(MergeError::InvalidArguments(format!(
                        "destination '{}' is not a regular file",
                        self.destination.display()
                    )));
                }
                let dest = FileId::of(&self.destination, &meta)
                    .map_err(|e| MergeError::file(&self.destination, e))?;
                for (id, path) in [(&id1, &self.first), (&id2, &self.second)] {
                    if *id == dest {
                        return Err(MergeError::InvalidArguments(format!(
                            "input '{}' is also the destination",
                            path.display()
                        )));
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(MergeError::file(&self.destination, e)),
        }

        Ok(meta1.permissions())
    }

    /// Name the file behind an I/O failure reported by the stream merge.
    pub(crate) fn locate(&self, err: MergeError) -> MergeError {
        match err {
            MergeError::Read {
                input: Source::First,
                source,
            } => MergeError::file(&self.first, source),
            MergeError::Read {
                input: Source::Second,
                source,
            } => MergeError::file(&self.second, source),
            MergeError::Io(source) => MergeError::file(&self.destination, source),
            other => other,
        }
    }
}

fn source_metadata(path: &Path) -> Result<fs::Metadata> {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(MergeError::SourceNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(MergeError::file(path, e)),
    };
    if !meta.is_file() {
        return Err(MergeError::SourceNotRegularFile(path.to_path_buf()));
    }
    Ok(meta)
}

fn open_source(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| MergeError::file(path, e))
}

/// Validate `request`, merge its sources into a temporary file, and install
/// the result at the destination. On any error the destination is untouched.
pub fn merge_files(request: &MergeRequest) -> Result<MergeSummary> {
    let permissions = request.validate()?;
    debug!(
        first = %request.first.display(),
        second = %request.second.display(),
        destination = %request.destination.display(),
        "request validated"
    );

    let first = open_source(&request.first)?;
    let second = open_source(&request.second)?;
    let pending = PendingOutput::create(&request.destination)?;

    let stats = merge_streams(first, second, pending.file(), &request.options)
        .map_err(|e| request.locate(e))?;
    pending.commit(Some(permissions))?;

    Ok(MergeSummary {
        lines_written: request.options.count_lines.then_some(stats.lines_written),
        stats,
    })
}
