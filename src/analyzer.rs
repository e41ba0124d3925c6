// src/analyzer.rs

use crate::discover;
use crate::error::{ChronicleError, ExtractError};
use crate::extract::{self, Extraction, Filter};
use crate::model::*;
use crate::source::HistorySource;
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use tracing::{info, warn};

/// Finds every repository under `config.root` and collects the matching commits.
///
/// Discovery finishes before extraction starts. Repositories are then read on a
/// worker pool of `config.jobs` threads; results are merged back in discovery
/// order so the report is the same whatever the thread count.
pub fn analyze(config: &Config, source: &dyn HistorySource) -> Result<AnalysisResult, ChronicleError> {
    discover::ensure_root(&config.root)?;
    info!("Scanning {} for git repositories", config.root.display());

    let mut discovery = discover::discover(&config.root, config.follow_links);
    let repos: Vec<RepositoryLocation> = discovery.by_ref().collect();
    info!("Found {} git repositories", repos.len());

    let filter = Filter {
        usernames: config.usernames.clone(),
        range: config.range,
    };

    let bar = if config.progress {
        ProgressBar::new(repos.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_message("Reading history");

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = config.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder.build()?;

    let mut outcomes: Vec<(usize, Result<Extraction, ExtractError>)> = pool.install(|| {
        repos
            .par_iter()
            .progress_with(bar.clone())
            .map(|repo| {
                info!(repo = %repo.relative, "Processing repository");
                (repo.index, extract::extract(repo, source, &filter))
            })
            .collect()
    });
    bar.finish_and_clear();
    outcomes.sort_by_key(|(index, _)| *index);

    let mut summary = RunSummary {
        repositories_found: repos.len(),
        unreadable_dirs: discovery.unreadable(),
        ..Default::default()
    };
    let mut records = Vec::new();

    for (index, outcome) in outcomes {
        match outcome {
            Ok(extraction) => {
                summary.repositories_scanned += 1;
                summary.malformed_lines += extraction.malformed_lines;
                summary.bad_dates += extraction.bad_dates;
                summary.authors.extend(extraction.authors);
                records.extend(extraction.records);
            }
            Err(err) => {
                warn!(repo = %repos[index].relative, error = %err, "Skipping repository");
                summary.repositories_skipped += 1;
            }
        }
    }
    summary.commits_matched = records.len();
    summary.matched_authors = records.iter().map(|r| r.author.clone()).collect();

    Ok(AnalysisResult { records, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Backend, SortOrder};
    use crate::extract::testing::CannedSource;
    use crate::source::{fixture, GitCli, Libgit2};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path, users: &[&str], jobs: usize) -> Config {
        Config {
            root: root.to_path_buf(),
            output: root.join("out.xlsx"),
            usernames: UsernameSet::new(users),
            range: DateRange::new(
                Some("2024-01-01".parse().unwrap()),
                Some("2024-01-31".parse().unwrap()),
            )
            .unwrap(),
            order: SortOrder::Desc,
            backend: Backend::GitCli,
            git_binary: "git".into(),
            follow_links: false,
            jobs: Some(jobs),
            progress: false,
        }
    }

    fn mark(dir: &Path) {
        fs::create_dir_all(dir.join(".git")).unwrap();
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(&tmp.path().join("nope"), &["alice"], 1);
        let err = analyze(&cfg, &CannedSource::default()).unwrap_err();
        assert!(matches!(err, ChronicleError::RootNotFound(_)));
    }

    #[test]
    fn no_repositories_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = analyze(&config(tmp.path(), &["alice"], 1), &CannedSource::default()).unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.summary, RunSummary::default());
    }

    #[test]
    fn failing_repository_is_skipped() {
        let tmp = TempDir::new().unwrap();
        mark(&tmp.path().join("broken"));
        mark(&tmp.path().join("works"));
        // no canned log for "broken": the source reports git as missing
        let source = CannedSource::default().with(
            tmp.path().join("works"),
            &["2024-01-10T08:00:00Z\x1falice\x1fshipped"],
        );

        let result = analyze(&config(tmp.path(), &["alice"], 1), &source).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].repository, "works");
        assert_eq!(result.summary.repositories_found, 2);
        assert_eq!(result.summary.repositories_scanned, 1);
        assert_eq!(result.summary.repositories_skipped, 1);
        assert_eq!(result.summary.commits_matched, 1);
    }

    #[test]
    fn records_follow_discovery_order_for_any_job_count() {
        let tmp = TempDir::new().unwrap();
        let mut source = CannedSource::default();
        for name in ["a", "b", "c", "d", "e", "f"] {
            let dir = tmp.path().join(name);
            mark(&dir);
            source = source.with(
                dir,
                &[
                    format!("2024-01-02T00:00:00Z\x1falice\x1f{name}-2").as_str(),
                    format!("2024-01-01T00:00:00Z\x1falice\x1f{name}-1").as_str(),
                ],
            );
        }

        let sequential = analyze(&config(tmp.path(), &["alice"], 1), &source).unwrap();
        let parallel = analyze(&config(tmp.path(), &["alice"], 4), &source).unwrap();
        assert_eq!(sequential.records, parallel.records);

        let indexes: Vec<_> = parallel.records.iter().map(|r| r.discovery_index).collect();
        assert_eq!(indexes, [0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
    }

    #[test]
    fn missing_git_binary_skips_only_that_repository() {
        let tmp = TempDir::new().unwrap();
        fixture::repo_with_commits(
            &tmp.path().join("one"),
            &[("2024-01-05T00:00:00+00:00", "alice", "fix bug")],
        );
        let cfg = config(tmp.path(), &["alice"], 1);

        let missing = GitCli::new(tmp.path().join("no-such-git"));
        let result = analyze(&cfg, &missing).unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.summary.repositories_skipped, 1);

        let result = analyze(&cfg, &Libgit2).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].message, "fix bug");
        assert!(result.summary.authors.contains("alice"));
    }

    #[test]
    fn end_to_end_scenario_with_libgit2() {
        let tmp = TempDir::new().unwrap();
        fixture::repo_with_commits(
            &tmp.path().join("A"),
            &[
                ("2024-01-05T00:00:00+00:00", "alice", "fix bug"),
                ("2024-02-10T00:00:00+00:00", "bob", "refactor"),
            ],
        );
        let cfg = config(tmp.path(), &["alice"], 2);
        let result = analyze(&cfg, &Libgit2).unwrap();

        let rows = crate::report::rows(&result.records);
        assert_eq!(rows, [["A".to_string(), "2024-01-05 00:00:00".to_string(), "fix bug".to_string()]]);
        assert_eq!(
            result.summary.authors.iter().collect::<Vec<_>>(),
            ["alice", "bob"]
        );
    }
}
