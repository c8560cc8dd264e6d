//! Filter loader: compiles sources into live instances, detects changed
//! sources and maintains the per-type, priority-ordered filter index.
//!
//! File sources are considered stale when their modification time differs
//! from the one recorded at their last successful load. Inline sources are
//! compared by exact text.

mod core;
mod index;


pub use self::core::{FilterLoader, LoaderContext};
