//! Output formatting and styling module.
//!
//! All terminal output of the command-line tool goes through
//! [`OutputFormatter`]. Match paths are printed without styling so the
//! output of `scan` and `assess` can be piped into other tools.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use crate::shuffle::ShuffleReport;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for copy batches
/// - Shuffle summaries
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirshape::output::OutputFormatter;
    /// OutputFormatter::success("Copied 3 directories");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints one path per line, unstyled.
    pub fn paths<'a>(paths: impl IntoIterator<Item = &'a Path>) {
        for path in paths {
            println!("{}", path.display());
        }
    }

    /// Creates a progress bar for a copy batch.
    ///
    /// ```no_run
    /// use dirshape::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(10);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints copied pairs, skipped and failed inputs, and the final count.
    pub fn shuffle_summary(report: &ShuffleReport, dryrun: bool) {
        for result in &report.copied {
            println!(
                "{} -> {}",
                result.source.display(),
                result.destination.display()
            );
        }

        if !report.skipped.is_empty() {
            Self::warning(&format!("Skipped: {}", report.skipped.len()));
            for (input, reason) in &report.skipped {
                println!("    - {}: {}", input.source.display(), reason);
            }
        }

        if !report.failed.is_empty() {
            Self::error(&format!("Failed: {}", report.failed.len()));
            for (input, reason) in &report.failed {
                eprintln!("    - {}: {}", input.source.display(), reason);
            }
        }

        let count = format!("Copied {} directories", report.copied.len());
        if dryrun {
            Self::dry_run_notice(&count);
        } else {
            Self::plain(&count);
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}
