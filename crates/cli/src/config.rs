use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use sieve_core::{Config, FilterConfig};

use crate::cli::ConfigOverrides;

/// Shape of the optional TOML config file.
#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    filters: FileFilters,
}

/// `[filters]` table. Every key is optional; keys left out keep the value
/// taken from the environment.
#[derive(Debug, Default, Deserialize)]
struct FileFilters {
    roots: Option<Vec<String>>,
    poll_interval_seconds: Option<u64>,
    resource_dirs: Option<Vec<PathBuf>>,
    extensions: Option<Vec<String>>,
}

/// Resolve the effective filter config, layered key by key.
/// Priority: CLI arguments > config file > environment > defaults.
pub fn resolve(overrides: &ConfigOverrides) -> Result<Config> {
    let mut config = Config::from_env();

    if let Some(path) = &overrides.config {
        apply_file(&mut config.filters, load_file(path)?);
    }
    apply_overrides(&mut config.filters, overrides);

    if config.filters.roots.is_empty() {
        anyhow::bail!("no filter roots configured (set FILTER_DIRS, --dirs, or [filters].roots)");
    }
    Ok(config)
}

fn load_file(path: &Path) -> Result<FileFilters> {
    debug!(path = %path.display(), "Loading config");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let file: FileConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
    Ok(file.filters)
}

fn apply_file(filters: &mut FilterConfig, file: FileFilters) {
    if let Some(roots) = file.roots {
        filters.roots = roots;
    }
    if let Some(interval) = file.poll_interval_seconds {
        filters.poll_interval_seconds = interval;
    }
    if let Some(resource_dirs) = file.resource_dirs {
        filters.resource_dirs = resource_dirs;
    }
    if let Some(extensions) = file.extensions.filter(|e| !e.is_empty()) {
        filters.extensions = extensions;
    }
}

fn apply_overrides(filters: &mut FilterConfig, overrides: &ConfigOverrides) {
    if !overrides.dirs.is_empty() {
        filters.roots = overrides.dirs.clone();
    }
    if let Some(interval) = overrides.interval {
        filters.poll_interval_seconds = interval;
    }
    if !overrides.resource_dirs.is_empty() {
        filters.resource_dirs = overrides.resource_dirs.clone();
    }
    if !overrides.extensions.is_empty() {
        filters.extensions = overrides.extensions.clone();
    }
}
