// src/extract.rs

use crate::error::{ExtractError, RecordError};
use crate::model::{CommitRecord, DateRange, RepositoryLocation, UsernameSet};
use crate::source::{HistorySource, FIELD_SEPARATOR};
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// git's `--date=iso` layout, accepted alongside RFC 3339
const GIT_ISO_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// One commit as read from the log, before filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<FixedOffset>,
    pub author: String,
    pub message: String,
}

/// Splits on the first two separators only; the subject keeps any further ones.
pub fn parse_line(line: &str) -> Result<LogEntry, RecordError> {
    let fields: Vec<&str> = line.splitn(3, FIELD_SEPARATOR).collect();
    let &[date, author, message] = fields.as_slice() else {
        return Err(RecordError::Malformed { found: fields.len() });
    };
    Ok(LogEntry {
        timestamp: parse_timestamp(date)?,
        author: author.to_string(),
        message: message.to_string(),
    })
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, RecordError> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, GIT_ISO_FORMAT))
        .map_err(|_| RecordError::BadDate(s.to_string()))
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub usernames: UsernameSet,
    pub range: DateRange,
}

impl Filter {
    pub fn accepts(&self, entry: &LogEntry) -> bool {
        self.usernames.matches(&entry.author) && self.range.contains(&entry.timestamp)
    }
}

/// What one repository contributed
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<CommitRecord>,
    pub authors: BTreeSet<String>,
    pub total_entries: usize,
    pub malformed_lines: usize,
    pub bad_dates: usize,
}

/// Reads one repository's history and keeps the commits `filter` accepts.
///
/// A failing log query is returned as an error so the caller can skip the
/// repository. Bad lines are skipped and counted; a failing author query is
/// only logged.
pub fn extract(
    location: &RepositoryLocation,
    source: &dyn HistorySource,
    filter: &Filter,
) -> Result<Extraction, ExtractError> {
    let log = source.log(&location.path)?;
    let mut extraction = Extraction::default();

    for (line_no, line) in log.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
        extraction.total_entries += 1;
        let entry = match parse_line(line) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(repo = %location.relative, line = line_no + 1, error = %err, "Skipping log entry");
                match err {
                    RecordError::Malformed { .. } => extraction.malformed_lines += 1,
                    RecordError::BadDate(_) => extraction.bad_dates += 1,
                }
                continue;
            }
        };
        if filter.accepts(&entry) {
            extraction.records.push(CommitRecord {
                repository: location.relative.clone(),
                timestamp: entry.timestamp,
                author: entry.author,
                message: entry.message,
                discovery_index: location.index,
            });
        }
    }

    match source.authors(&location.path) {
        Ok(authors) => {
            debug!(
                repo = %location.relative,
                "All authors: {}",
                authors.iter().cloned().collect::<Vec<_>>().join(", ")
            );
            extraction.authors = authors;
        }
        Err(err) => warn!(repo = %location.relative, error = %err, "Could not list authors"),
    }

    debug!(
        repo = %location.relative,
        entries = extraction.total_entries,
        matched = extraction.records.len(),
        "Extracted commits"
    );
    Ok(extraction)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// Serves canned log output per repository path; unknown paths fail to spawn
    #[derive(Default)]
    pub struct CannedSource {
        pub logs: HashMap<PathBuf, String>,
    }

    impl CannedSource {
        pub fn with(mut self, path: impl Into<PathBuf>, lines: &[&str]) -> Self {
            self.logs.insert(path.into(), lines.join("\n"));
            self
        }
    }

    impl HistorySource for CannedSource {
        fn log(&self, repo: &Path) -> Result<String, ExtractError> {
            self.logs.get(repo).cloned().ok_or_else(|| ExtractError::Spawn {
                program: "git".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            })
        }

        fn authors(&self, repo: &Path) -> Result<BTreeSet<String>, ExtractError> {
            let log = self.log(repo)?;
            Ok(log
                .lines()
                .filter_map(|l| l.split(FIELD_SEPARATOR).nth(1))
                .map(String::from)
                .collect())
        }
    }
}
