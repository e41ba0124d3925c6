// src/source.rs

use crate::cli::Backend;
use crate::error::ExtractError;
use chrono::{FixedOffset, TimeZone};
use git2::{Repository, Sort};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Separates the fields of one log line (ASCII unit separator)
pub const FIELD_SEPARATOR: char = '\x1f';

/// The two history queries the extractor relies on
pub trait HistorySource: Sync {
    /// One line per commit reachable from HEAD: `date<US>author<US>subject`,
    /// with the committer date in ISO 8601.
    fn log(&self, repo: &Path) -> Result<String, ExtractError>;

    /// Every distinct author name in the repository
    fn authors(&self, repo: &Path) -> Result<BTreeSet<String>, ExtractError>;
}

pub fn for_backend(backend: Backend, git_binary: &Path) -> Box<dyn HistorySource> {
    match backend {
        Backend::GitCli => Box::new(GitCli::new(git_binary)),
        Backend::Libgit2 => Box::new(Libgit2),
    }
}

/// Runs the `git` executable inside each repository
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    fn run(&self, repo: &Path, args: &[&str]) -> Result<String, ExtractError> {
        let program = self.binary.display().to_string();
        debug!(repo = %repo.display(), "Running {} {}", program, args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(repo)
            .output()
            .map_err(|source| ExtractError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl HistorySource for GitCli {
    fn log(&self, repo: &Path) -> Result<String, ExtractError> {
        self.run(
            repo,
            &["log", "--date=iso-strict", "--pretty=format:%cd%x1f%an%x1f%s"],
        )
    }

    fn authors(&self, repo: &Path) -> Result<BTreeSet<String>, ExtractError> {
        let out = self.run(repo, &["log", "--format=%an"])?;
        Ok(out
            .lines()
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Reads repositories in-process, no `git` executable needed
#[derive(Debug, Clone, Copy, Default)]
pub struct Libgit2;

impl Libgit2 {
    fn walk<F>(repo_path: &Path, mut visit: F) -> Result<(), ExtractError>
    where
        F: FnMut(&git2::Commit) -> Result<(), ExtractError>,
    {
        let repo = Repository::open(repo_path)?;
        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;

        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            visit(&commit)?;
        }
        Ok(())
    }
}

impl HistorySource for Libgit2 {
    fn log(&self, repo: &Path) -> Result<String, ExtractError> {
        let mut lines = Vec::new();
        Self::walk(repo, |commit| {
            let when = commit.committer().when();
            let offset = FixedOffset::east_opt(when.offset_minutes() * 60)
                .ok_or_else(|| git2::Error::from_str("commit has an invalid UTC offset"))?;
            let date = offset
                .timestamp_opt(when.seconds(), 0)
                .single()
                .ok_or_else(|| git2::Error::from_str("commit time out of range"))?;
            let author = commit.author();
            lines.push(format!(
                "{}{sep}{}{sep}{}",
                date.to_rfc3339(),
                String::from_utf8_lossy(author.name_bytes()),
                String::from_utf8_lossy(commit.summary_bytes().unwrap_or_default()),
                sep = FIELD_SEPARATOR,
            ));
            Ok(())
        })?;
        Ok(lines.join("\n"))
    }

    fn authors(&self, repo: &Path) -> Result<BTreeSet<String>, ExtractError> {
        let mut authors = BTreeSet::new();
        Self::walk(repo, |commit| {
            authors.insert(String::from_utf8_lossy(commit.author().name_bytes()).into_owned());
            Ok(())
        })?;
        Ok(authors)
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::repo_with_commits;
    use super::*;
    use crate::extract::parse_line;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn sample(dir: &Path) {
        repo_with_commits(
            dir,
            &[
                ("2024-01-05T09:30:00+01:00", "alice", "fix bug"),
                ("2024-02-10T12:00:00+00:00", "bob", "refactor\x1fparser, again"),
            ],
        );
    }

    #[test]
    fn libgit2_log_lists_newest_first() {
        let tmp = TempDir::new().unwrap();
        sample(tmp.path());

        let log = Libgit2.log(tmp.path()).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(
            lines,
            [
                "2024-02-10T12:00:00+00:00\x1fbob\x1frefactor\x1fparser, again",
                "2024-01-05T09:30:00+01:00\x1falice\x1ffix bug",
            ]
        );
    }

    #[test]
    fn libgit2_lists_distinct_authors() {
        let tmp = TempDir::new().unwrap();
        sample(tmp.path());
        let authors = Libgit2.authors(tmp.path()).unwrap();
        assert_eq!(authors.into_iter().collect::<Vec<_>>(), ["alice", "bob"]);
    }

    #[test]
    fn libgit2_fails_outside_a_repository() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(Libgit2.log(tmp.path()), Err(ExtractError::Git2(_))));
    }

    #[test]
    fn git_cli_matches_libgit2() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        sample(tmp.path());

        // Compare parsed entries: newer git prints `Z` for a zero offset
        let parsed = |log: String| -> Vec<_> {
            log.lines().map(|l| parse_line(l).unwrap()).collect()
        };
        let cli = GitCli::new("git");
        assert_eq!(parsed(cli.log(tmp.path()).unwrap()), parsed(Libgit2.log(tmp.path()).unwrap()));
        assert_eq!(cli.authors(tmp.path()).unwrap(), Libgit2.authors(tmp.path()).unwrap());
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let tmp = TempDir::new().unwrap();
        let cli = GitCli::new(tmp.path().join("no-such-git"));
        assert!(matches!(cli.log(tmp.path()), Err(ExtractError::Spawn { .. })));
    }

    #[test]
    fn git_cli_reports_non_zero_exit() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        // initialised but without commits: git log exits non-zero
        Repository::init(tmp.path()).unwrap();
        let err = GitCli::new("git").log(tmp.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Failed { .. }));
    }
}
