// src/cli.rs

use crate::error::ChronicleError;
use crate::model::{Config, DateRange, UsernameSet};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_REPORT_NAME: &str = "commit_history.xlsx";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory tree to scan for git repositories
    #[arg(short, long, env = "CHRONICLE_ROOT")]
    pub root: PathBuf,

    /// Author names to keep (case-insensitive, repeatable or comma separated)
    #[arg(short, long = "user", env = "CHRONICLE_USERS", value_delimiter = ',', required = true)]
    pub users: Vec<String>,

    /// First day to include (YYYY-MM-DD)
    #[arg(long, env = "CHRONICLE_SINCE")]
    pub since: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, env = "CHRONICLE_UNTIL")]
    pub until: Option<NaiveDate>,

    /// Report file; defaults to commit_history.xlsx inside the root
    #[arg(short, long, env = "CHRONICLE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Row order of the report
    #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
    pub order: SortOrder,

    /// How commit history is read
    #[arg(long, value_enum, default_value_t = Backend::GitCli)]
    pub backend: Backend,

    /// git executable used by the git-cli backend
    #[arg(long, env = "CHRONICLE_GIT", default_value = "git")]
    pub git_binary: PathBuf,

    /// Follow symbolic links while looking for repositories
    #[arg(long)]
    pub follow_links: bool,

    /// Number of repositories processed in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest commit first
    Asc,
    /// Newest commit first
    Desc,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Run the git executable
    GitCli,
    /// Read repositories in-process through libgit2
    Libgit2,
}

impl Args {
    pub fn into_config(self) -> Result<Config, ChronicleError> {
        let usernames = UsernameSet::new(self.users.iter().filter(|u| !u.is_empty()));
        if usernames.is_empty() {
            return Err(ChronicleError::NoUsernames);
        }
        let range = DateRange::new(self.since, self.until)?;
        let output = self
            .output
            .unwrap_or_else(|| self.root.join(DEFAULT_REPORT_NAME));

        Ok(Config {
            root: self.root,
            output,
            usernames,
            range,
            order: self.order,
            backend: self.backend,
            git_binary: self.git_binary,
            follow_links: self.follow_links,
            jobs: self.jobs,
            progress: !self.no_progress && !self.quiet,
        })
    }
}
