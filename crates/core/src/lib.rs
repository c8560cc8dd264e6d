pub mod config;
pub mod error;
pub mod filter;

pub use config::{Config, FilterConfig};
pub use error::*;
pub use filter::*;
