//! Output module for console output and progress.

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{print_banner, print_config_summary, print_error, print_info, print_success, print_warning};
pub use progress::{create_item_bar, create_spinner};
pub use stats::{print_fetch_stats, print_scan_stats};
