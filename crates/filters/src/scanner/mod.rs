//! Background discovery of filter sources.
//!
//! [`FilterScanner`] resolves its root directories, performs one synchronous
//! scan, then re-scans on a dedicated thread at a fixed interval. Every file
//! accepted by the [`FilenameFilter`] is fed to the loader; failures are
//! reported per file and never stop the scan or the polling loop.

mod core;
mod discovery;
mod report;
mod resolver;


pub use self::core::{FilterScanner, ScannerBuilder};
pub use self::discovery::FilenameFilter;
pub use self::report::{LoadResult, LoadStatus, ScanReport};
pub use self::resolver::{FsResolver, ResourceResolver};
