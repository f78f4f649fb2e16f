//! Local scanning.

pub mod scanner;

pub use scanner::{LocalScanner, ScanEvent, ScanOptions, ScanResult};
