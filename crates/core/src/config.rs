use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Key lookup used to build config. Production reads the process
/// environment; tests pass a closure over a fixed map.
type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read a profiled key: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt(lookup: Lookup<'_>, profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed) {
            return Some(v);
        }
    }
    lookup(key)
}

fn profiled_u64(lookup: Lookup<'_>, profile: &str, key: &str, default: u64) -> u64 {
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated value, dropping blanks.
fn profiled_list(lookup: Lookup<'_>, profile: &str, key: &str) -> Option<Vec<String>> {
    profiled_opt(lookup, profile, key).map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub filters: FilterConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SIEVE_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("SIEVE_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        Self::from_lookup(profile, &env_opt)
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(profile: &str, lookup: Lookup<'_>) -> Self {
        let p = profile.to_uppercase();
        Self {
            filters: FilterConfig::from_lookup(lookup, &p),
            profile: p,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() {
            "default"
        } else {
            &self.profile
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  roots:          {:?}", self.filters.roots);
        tracing::info!("  poll_interval:  {}s", self.filters.poll_interval_seconds);
        tracing::info!("  resource_dirs:  {:?}", self.filters.resource_dirs);
        tracing::info!("  extensions:     {:?}", self.filters.extensions);
    }
}

// ── Filters ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Directories polled for filter sources. Each is a literal path or a
    /// name looked up under `resource_dirs`.
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Packaged-resource fallback locations for roots that are not literal directories.
    #[serde(default)]
    pub resource_dirs: Vec<PathBuf>,
    /// File extensions treated as filter sources.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_extensions() -> Vec<String> {
    vec!["yml".to_string(), "yaml".to_string()]
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            poll_interval_seconds: default_poll_interval(),
            resource_dirs: Vec::new(),
            extensions: default_extensions(),
        }
    }
}

impl FilterConfig {
    fn from_lookup(lookup: Lookup<'_>, p: &str) -> Self {
        Self {
            roots: profiled_list(lookup, p, "FILTER_DIRS").unwrap_or_default(),
            poll_interval_seconds: profiled_u64(
                lookup,
                p,
                "FILTER_POLL_INTERVAL_SECONDS",
                default_poll_interval(),
            ),
            resource_dirs: profiled_list(lookup, p, "FILTER_RESOURCE_DIRS")
                .unwrap_or_default()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            extensions: profiled_list(lookup, p, "FILTER_EXTENSIONS")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_extensions),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}
