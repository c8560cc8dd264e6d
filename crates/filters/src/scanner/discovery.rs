//! Recursive filter file discovery.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Decides which files under a root are filter sources.
#[derive(Clone)]
pub struct FilenameFilter {
    predicate: Arc<dyn Fn(&Path) -> bool + Send + Sync>,
    label: String,
}

impl FilenameFilter {
    /// Accept files whose extension is one of `extensions` (without the dot).
    pub fn extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exts: Vec<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .collect();
        let label = format!("extensions {:?}", exts);
        Self {
            predicate: Arc::new(move |path: &Path| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| exts.iter().any(|x| x == e))
                    .unwrap_or(false)
            }),
            label,
        }
    }

    /// Accept files matching an arbitrary predicate.
    pub fn custom(predicate: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
            label: "custom".to_string(),
        }
    }

    /// Dotfiles are never filter sources.
    pub fn matches(&self, path: &Path) -> bool {
        !is_hidden_name(path) && (self.predicate)(path)
    }
}

impl Default for FilenameFilter {
    fn default() -> Self {
        Self::extensions(["yml", "yaml"])
    }
}

impl fmt::Debug for FilenameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilenameFilter").field(&self.label).finish()
    }
}

/// Collect matching files under `dir`.
///
/// Order is deterministic: within each directory, files (by name) come before
/// subdirectories (by name), and subdirectories are walked depth-first.
/// Hidden directories are skipped; unreadable entries are logged and skipped.
pub(super) fn discover_files(dir: &Path, filter: &FilenameFilter) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by(files_first)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_name(e.path()));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(root = %dir.display(), error = %e, "walkdir error, skipping entry");
                continue;
            }
        };
        if entry.file_type().is_file() && filter.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_hidden_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
