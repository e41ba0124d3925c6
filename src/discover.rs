// src/discover.rs

use crate::error::ChronicleError;
use crate::model::RepositoryLocation;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Name of the metadata entry that marks a repository
pub const MARKER: &str = ".git";

/// Fails if the scan root is missing, not a directory, or cannot be listed
pub fn ensure_root(root: &Path) -> Result<(), ChronicleError> {
    let metadata = fs::metadata(root).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ChronicleError::RootNotFound(root.to_path_buf()),
        _ => ChronicleError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_dir() {
        return Err(ChronicleError::RootNotDirectory(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| ChronicleError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Lazily walks `root` and yields every directory that directly holds a `.git` entry.
///
/// Entries are visited in file-name order. The walk never enters `.git` itself,
/// but it does continue into a repository's working tree, so nested repositories
/// are found too. Each repository is reported once, keyed by its canonical path.
pub fn discover(root: &Path, follow_links: bool) -> Discovery {
    let walker = WalkDir::new(root)
        .follow_links(follow_links)
        .sort_by_file_name()
        .into_iter();

    Discovery {
        root: root.to_path_buf(),
        walker: Box::new(walker.filter_entry(|entry| entry.file_name() != MARKER)),
        seen: HashSet::new(),
        found: 0,
        unreadable: 0,
    }
}

pub struct Discovery {
    root: PathBuf,
    walker: Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>>>,
    seen: HashSet<PathBuf>,
    found: usize,
    unreadable: usize,
}

impl Discovery {
    /// Directories skipped so far because they could not be read
    pub fn unreadable(&self) -> usize {
        self.unreadable
    }
}

impl Iterator for Discovery {
    type Item = RepositoryLocation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %path.display(), error = %err, "Skipping unreadable directory");
                    self.unreadable += 1;
                    continue;
                }
            };

            if !entry.file_type().is_dir() || !entry.path().join(MARKER).exists() {
                continue;
            }

            let path = entry.into_path();
            let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if !self.seen.insert(canonical) {
                debug!(path = %path.display(), "Repository already discovered through another path");
                continue;
            }

            let location = RepositoryLocation {
                relative: relative_name(&self.root, &path),
                path,
                index: self.found,
            };
            self.found += 1;
            return Some(location);
        }
    }
}

/// Path of `path` below `root`, joined with `/` whatever the platform
pub fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
