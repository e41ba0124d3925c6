// src/error.rs

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the run
#[derive(Debug, Error)]
pub enum ChronicleError {
    #[error("Root directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Root path is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("Root directory cannot be read: {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("At least one username is required")]
    NoUsernames,

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to write report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: ReportError,
    },
}

/// A history query failed for one repository; the repository is skipped
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("libgit2: {0}")]
    Git2(#[from] git2::Error),
}

/// A single log line could not be turned into a commit
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected 3 fields, found {found}")]
    Malformed { found: usize },

    #[error("unparsable date {0:?}")]
    BadDate(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),
}
