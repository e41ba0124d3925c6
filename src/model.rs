// src/model.rs

use crate::cli::{Backend, SortOrder};
use crate::error::ChronicleError;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;

/// A repository found under the scan root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocation {
    pub path: PathBuf,
    /// Path relative to the scan root, `/` separated; `.` for the root itself
    pub relative: String,
    /// Position in discovery order
    pub index: usize,
}

/// One matched commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub repository: String,
    pub timestamp: DateTime<FixedOffset>,
    pub author: String,
    pub message: String,
    pub discovery_index: usize,
}

/// Accepted author names, compared case-insensitively
#[derive(Debug, Clone, Default)]
pub struct UsernameSet {
    folded: HashSet<String>,
    original: Vec<String>,
}

impl UsernameSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in names {
            let name = name.as_ref();
            if set.folded.insert(name.to_lowercase()) {
                set.original.push(name.to_string());
            }
        }
        set
    }

    pub fn matches(&self, author: &str) -> bool {
        self.folded.contains(&author.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    /// Names as configured, first spelling wins
    pub fn names(&self) -> &[String] {
        &self.original
    }
}

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, ChronicleError> {
        let start = start.unwrap_or(NaiveDate::MIN);
        let end = end.unwrap_or(NaiveDate::MAX);
        if start > end {
            return Err(ChronicleError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Checks the date as seen in the commit's own UTC offset
    pub fn contains(&self, timestamp: &DateTime<FixedOffset>) -> bool {
        let date = timestamp.date_naive();
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start == NaiveDate::MIN, self.end == NaiveDate::MAX) {
            (true, true) => write!(f, "all dates"),
            (true, false) => write!(f, "up to {}", self.end),
            (false, true) => write!(f, "from {}", self.start),
            (false, false) => write!(f, "{} to {}", self.start, self.end),
        }
    }
}

/// Everything a run needs, fixed before the pipeline starts
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub output: PathBuf,
    pub usernames: UsernameSet,
    pub range: DateRange,
    pub order: SortOrder,
    pub backend: Backend,
    pub git_binary: PathBuf,
    pub follow_links: bool,
    pub jobs: Option<usize>,
    pub progress: bool,
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub repositories_found: usize,
    pub repositories_scanned: usize,
    pub repositories_skipped: usize,
    pub unreadable_dirs: usize,
    pub malformed_lines: usize,
    pub bad_dates: usize,
    pub commits_matched: usize,
    /// Every author seen, matched or not
    pub authors: BTreeSet<String>,
    /// Author spellings that matched a configured username
    pub matched_authors: BTreeSet<String>,
}

/// The complete results of the scan
#[derive(Debug)]
pub struct AnalysisResult {
    /// Matched commits in discovery order, then log order
    pub records: Vec<CommitRecord>,
    pub summary: RunSummary,
}
