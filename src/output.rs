//! Output formatting and styling module.
//!
//! Provides a centralized interface for all terminal output: colored status
//! lines, the end-of-run summary tables, and spinners for long phases. Log
//! files are handled separately by [`crate::logging`]; everything a user
//! sees on screen goes through here.

use crate::pipeline::RunSummary;
use crate::placement::{OperationStatus, PlacementStats};
use crate::undo::UndoEntry;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
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

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a ticking spinner shown while a blocking phase runs.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// let spinner = OutputFormatter::create_spinner("organizing files");
    /// // ... long-running work ...
    /// spinner.finish_and_clear();
    /// ```
    pub fn create_spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("Invalid spinner template"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Prints the full end-of-run report: category table, placement counts,
    /// duplicate findings, and the statistics block when collected.
    pub fn run_summary(summary: &RunSummary) {
        if summary.cancelled {
            Self::warning("Run cancelled; phases already completed were kept.");
        }

        Self::plain(&format!(
            "Scanned {} files ({} filtered out)",
            summary.scanned, summary.filtered_out
        ));

        if !summary.category_counts.is_empty() {
            Self::category_table(&summary.category_counts);
        }

        if let Some(duplicates) = &summary.duplicates {
            Self::header("DUPLICATES");
            if duplicates.group_count == 0 {
                Self::plain("No duplicate files found.");
            } else {
                Self::plain(&format!(
                    "{} groups, {} files, {:.2} MB wasted",
                    duplicates.group_count,
                    duplicates.total_duplicate_files,
                    duplicates.wasted_bytes as f64 / (1024.0 * 1024.0)
                ));
                if let Some(groups) = &summary.duplicate_groups {
                    for (digest, files) in groups {
                        Self::plain(&format!("  {} ({} copies):", &digest[..12], files.len()));
                        for file in files {
                            Self::plain(&format!("    {}", file.path.display()));
                        }
                    }
                }
            }
        }

        if let Some(stats) = &summary.stats {
            for line in stats.render_report().lines() {
                Self::plain(line);
            }
        }

        if let Some(placement) = &summary.placement {
            Self::placement_summary(placement);
        }
    }

    /// Prints the per-category file counts as a table.
    pub fn category_table(category_counts: &BTreeMap<String, usize>) {
        Self::header("CATEGORIES");

        let max_category_len = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max("Category".len());

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        let mut total = 0;
        for (category, count) in category_counts {
            total += count;
            let file_word = if *count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                file_word,
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            if total == 1 { "file" } else { "files" },
            width = max_category_len
        );
    }

    /// Prints placement counts and any per-file failures.
    pub fn placement_summary(stats: &PlacementStats) {
        Self::header("PLACEMENT");
        let previewed = stats
            .operations
            .iter()
            .any(|op| op.status == OperationStatus::Previewed);
        if previewed {
            Self::dry_run_notice("No files were copied; the plan below is a preview.");
        }
        Self::plain(&format!(
            "Total: {}  Placed: {}  Skipped: {}  Errors: {}",
            stats.total, stats.placed, stats.skipped, stats.errors
        ));

        for operation in &stats.operations {
            match operation.status {
                OperationStatus::Error => Self::error(&format!(
                    "{}: {}",
                    operation.source.display(),
                    operation.error.as_deref().unwrap_or("unknown error")
                )),
                OperationStatus::Skipped => Self::warning(&format!(
                    "skipped {}: {}",
                    operation.source.display(),
                    operation.error.as_deref().unwrap_or("no destination")
                )),
                _ => {}
            }
        }
    }

    /// Prints journal entries, marking where the cursor sits.
    pub fn history_listing(entries: &[UndoEntry], cursor: usize) {
        Self::header("HISTORY");
        if entries.is_empty() {
            Self::plain("No recorded runs.");
            return;
        }
        for entry in entries {
            let marker = if entry.id < cursor { " " } else { "↶" };
            Self::plain(&format!(
                "{} #{} {} at {} ({} operations)",
                marker,
                entry.id,
                entry.op_type,
                entry.timestamp,
                entry.operations.len()
            ));
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}
