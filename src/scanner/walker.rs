//! Directory walker built on [`walkdir`].
//!
//! # Overview
//!
//! The [`Walker`] yields the paths of regular files under a root, in a
//! deterministic order (entries sorted by file name at every level). A root
//! that is itself a file yields just that file. Directories are never
//! yielded.
//!
//! # Features
//!
//! - Optional symlink following (cycles surface as walk errors)
//! - Hidden entry skipping
//! - Gitignore-style exclusions via the `ignore` crate
//!
//! # Example
//!
//! ```no_run
//! use findex::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     skip_hidden: true,
//!     ignore_patterns: vec!["*.tmp".to_string()],
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/Documents"), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::{ScanError, WalkerConfig};

/// Sequential file discovery under a root path.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Build the exclusion matcher from configured patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Decide whether an entry (and, for directories, its subtree) is visited.
    fn should_visit(&self, entry: &DirEntry, gitignore: Option<&Gitignore>) -> bool {
        // The root is always visited, even if hidden or matching a pattern.
        if entry.depth() == 0 {
            return true;
        }

        if self.config.skip_hidden && is_hidden(entry) {
            log::trace!("Skipping hidden entry: {}", entry.path().display());
            return false;
        }

        if let Some(gi) = gitignore {
            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            if gi.matched(relative, entry.file_type().is_dir()).is_ignore() {
                log::trace!("Ignoring: {}", entry.path().display());
                return false;
            }
        }

        true
    }

    /// Walk the tree, yielding regular file paths.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        let gitignore = self.build_gitignore();

        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.should_visit(entry, gitignore.as_ref()))
            .filter_map(move |result| match result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_file() {
                        Some(Ok(entry.into_path()))
                    } else {
                        if file_type.is_symlink() {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        }
                        None
                    }
                }
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        use std::io::ErrorKind;

        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            log::warn!(
                "Symlink cycle at {} (back to {})",
                path.display(),
                ancestor.display()
            );
        }

        match error.io_error().map(std::io::Error::kind) {
            Some(ErrorKind::PermissionDenied) => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(ErrorKind::NotFound) => {
                log::debug!("Not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("Walker error for {}: {}", path.display(), error);
                let source = error
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
                ScanError::Io { path, source }
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().as_encoded_bytes().first() == Some(&b'.')
}
