use std::fmt;
use std::io;
use std::path::PathBuf;

/// Which of the two inputs a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    First,
    Second,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::First => f.write_str("file 1"),
            Source::Second => f.write_str("file 2"),
        }
    }
}

/// Errors produced by a merge.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Malformed or contradictory request, rejected before any file is opened.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{}: No such file or directory", .0.display())]
    SourceNotFound(PathBuf),

    #[error("{}: not a regular file", .0.display())]
    SourceNotRegularFile(PathBuf),

    /// Read failure on one of the inputs.
    #[error("{input}: {source}")]
    Read {
        input: Source,
        #[source]
        source: io::Error,
    },

    /// Write or flush failure on the output stream.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// I/O failure tied to a specific path.
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination was created or replaced by someone else while the
    /// merge was running; the merged result has been discarded.
    #[error("{}: destination changed during merge, result discarded", .0.display())]
    DestinationConflict(PathBuf),

    /// Strict mode found a line ordered before the last line written.
    #[error("{input} is not in sorted order (line {line})")]
    NotSorted { input: Source, line: u64 },
}

impl MergeError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MergeError::File {
            path: path.into(),
            source,
        }
    }

    /// The underlying I/O error, if this is an I/O failure.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            MergeError::Io(e) => Some(e),
            MergeError::Read { source, .. } | MergeError::File { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Process exit status for this error: 1 for unsorted input, 2 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            MergeError::NotSorted { .. } => 1,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
