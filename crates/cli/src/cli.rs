use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Dynamic filter loader for the sieve gateway.
///
/// Polls filter directories, compiles changed filter sources and keeps the
/// active, priority-ordered filter set per type.
#[derive(Parser, Debug)]
#[command(name = "sieve", version, about)]
pub struct CliArgs {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings that override the environment and the config file.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Path to a TOML config file (a `[filters]` table).
    #[arg(long, global = true, env = "SIEVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Filter roots, comma separated. Replaces FILTER_DIRS.
    #[arg(long, global = true, value_delimiter = ',')]
    pub dirs: Vec<String>,

    /// Poll interval in seconds. Replaces FILTER_POLL_INTERVAL_SECONDS.
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Packaged-resource directories used when a root is not a literal path.
    #[arg(long, global = true, value_delimiter = ',')]
    pub resource_dirs: Vec<PathBuf>,

    /// Filter file extensions, comma separated. Replaces FILTER_EXTENSIONS.
    #[arg(long, global = true, value_delimiter = ',')]
    pub extensions: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan once, then keep polling until interrupted.
    Run,

    /// Scan once and print the active filters grouped by type as JSON.
    List {
        /// Only print filters of this type.
        #[arg(long = "type")]
        filter_type: Option<String>,
    },

    /// Compile a single filter source and report the result.
    Check {
        /// Filter source file.
        file: PathBuf,
    },
}
