//! Root directory resolution with a packaged-resource fallback.

use std::path::{Path, PathBuf};

use tracing::debug;

use sieve_core::{FilterError, Result};

/// Maps a configured root to a directory on disk.
pub trait ResourceResolver: Send + Sync {
    /// Resolve `root` to an existing directory, or fail with [`FilterError::Config`].
    fn resolve(&self, root: &str) -> Result<PathBuf>;
}

/// Resolves literal directory paths first, then `<resource_dir>/<root>` for
/// each packaged-resource directory in order.
#[derive(Debug, Default, Clone)]
pub struct FsResolver {
    resource_dirs: Vec<PathBuf>,
}

impl FsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_dirs(resource_dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            resource_dirs: resource_dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn resource_dirs(&self) -> &[PathBuf] {
        &self.resource_dirs
    }
}

impl ResourceResolver for FsResolver {
    fn resolve(&self, root: &str) -> Result<PathBuf> {
        let literal = Path::new(root);
        if literal.is_dir() {
            return Ok(literal.to_path_buf());
        }

        for base in &self.resource_dirs {
            let candidate = base.join(root);
            if candidate.is_dir() {
                debug!(root, path = %candidate.display(), "resolved filter root from resources");
                return Ok(candidate);
            }
        }

        Err(FilterError::Config(format!(
            "{} is not a valid directory",
            literal.display()
        )))
    }
}
