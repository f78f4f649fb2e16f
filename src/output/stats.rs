//! Statistics reporting.

use console::style;

use crate::fetch::FetchSummary;
use crate::scan::ScanResult;

/// Print statistics for one scan pass.
pub fn print_scan_stats(result: &ScanResult) {
    println!();
    println!("{}", style("Scan results:").bold());
    println!("  Galleries: {}", style(result.galleries.len()).green());
    println!("  Skipped:   {}", result.skipped.len());
    for (path, reason) in &result.skipped {
        println!("    {} ({})", path.display(), style(reason).yellow());
    }
}

/// Print the aggregate summary of a fetch session.
pub fn print_fetch_stats(summary: &FetchSummary) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Fetch session:").bold());
    println!("  Matched:   {}", style(summary.succeeded).green());
    println!("  No match:  {}", summary.no_match);
    if summary.ambiguous > 0 {
        println!("  Undecided: {}", style(summary.ambiguous).yellow());
    }
    if summary.errored > 0 {
        println!("  Errors:    {}", style(summary.errored).red());
    }
    if let Some(fatal) = &summary.fatal {
        println!("  Aborted:   {}", style(fatal).red().bold());
    }
    println!("{}", style("═".repeat(50)).dim());
}
