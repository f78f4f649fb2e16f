//! Configuration loading, modes and validation.

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{Config, FetchConfig, LibraryConfig, WatchConfig};
pub use modes::{MatchStrategy, MergePolicy};
pub use validation::validate_config;
