use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{} not found. Please enter a valid path.", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("an I/O error was encountered reading {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid record in {} at line {line}: {reason}", path.display())]
    InvalidRecord {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("student {id} appears more than once in {}", path.display())]
    DuplicateStudent { path: PathBuf, id: String },

    /// Raised by the fallback pass; no partial assignment survives it.
    #[error("no papers left for student {student}: {students} students but only {papers} papers")]
    PoolExhausted {
        student: String,
        students: usize,
        papers: usize,
    },

    #[error("output file {} already exists", path.display())]
    OutputConflict { path: PathBuf },

    #[error("an I/O error occurred while writing to {}: {source}", path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Output-side failures leave the computed assignment intact.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::OutputConflict { .. } | Error::OutputWriteFailure { .. }
        )
    }

    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Error::SourceNotFound { path }
        } else {
            Error::SourceUnreadable { path, source }
        }
    }
}
