//! Dynamic filter loading for the sieve gateway.
//!
//! This crate provides:
//! - A thread-safe, insert-if-absent [`FilterRegistry`] keyed by source identity
//! - A [`FilterLoader`] that compiles sources, detects staleness and keeps a
//!   per-type, priority-ordered index of live filters
//! - A [`FilterScanner`] that polls filter directories on a background thread
//! - Default collaborators: [`YamlCompiler`], [`DefaultFactory`], [`FsResolver`]

pub mod compiler;
pub mod factory;
pub mod loader;
pub mod registry;
pub mod scanner;

mod sync;

pub use compiler::{FilterCompiler, YamlCompiler};
pub use factory::{DeclarativeFilter, DefaultFactory, FilterFactory};
pub use loader::{FilterLoader, LoaderContext};
pub use registry::FilterRegistry;
pub use scanner::{
    FilenameFilter, FilterScanner, FsResolver, LoadResult, LoadStatus, ResourceResolver,
    ScanReport, ScannerBuilder,
};

pub use sieve_core::{Filter, FilterDefinition, FilterError, FilterRef, Result};
