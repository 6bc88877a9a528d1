//! File statistics reporting.
//!
//! Aggregates a classified record set into totals, per-category and
//! per-extension counts, and the modification date range, and renders the
//! result as a human-readable report block.

use crate::classifier::OTHER_CATEGORY;
use crate::scanner::FileRecord;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Key used for files without an extension.
const NO_EXTENSION: &str = "(no extension)";

/// Per-category slice of the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStat {
    pub count: usize,
    pub bytes: u64,
}

/// Aggregate statistics over a scanned and classified file set.
#[derive(Debug, Clone, Default)]
pub struct FileStats {
    pub total_files: usize,
    pub total_bytes: u64,
    pub categories: BTreeMap<String, CategoryStat>,
    pub extensions: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Local>>,
    pub newest: Option<DateTime<Local>>,
}

impl FileStats {
    /// Collects statistics from a record set.
    ///
    /// Records the classifier has not touched yet count under `other`.
    pub fn collect(records: &[FileRecord]) -> Self {
        let mut stats = Self::default();

        for record in records {
            stats.total_files += 1;
            stats.total_bytes += record.size;

            let category = record.category.as_deref().unwrap_or(OTHER_CATEGORY);
            let entry = stats.categories.entry(category.to_string()).or_default();
            entry.count += 1;
            entry.bytes += record.size;

            let extension = if record.extension.is_empty() {
                NO_EXTENSION
            } else {
                record.extension.as_str()
            };
            *stats.extensions.entry(extension.to_string()).or_insert(0) += 1;

            stats.oldest = match stats.oldest {
                Some(oldest) if oldest <= record.modified => Some(oldest),
                _ => Some(record.modified),
            };
            stats.newest = match stats.newest {
                Some(newest) if newest >= record.modified => Some(newest),
                _ => Some(record.modified),
            };
        }

        stats
    }

    /// The `n` most common extensions, count descending, name ascending on
    /// ties.
    pub fn top_extensions(&self, n: usize) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = self
            .extensions
            .iter()
            .map(|(ext, &count)| (ext.as_str(), count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }

    /// Days between the oldest and newest modification times.
    pub fn span_days(&self) -> Option<i64> {
        match (self.oldest, self.newest) {
            (Some(oldest), Some(newest)) => Some((newest - oldest).num_days()),
            _ => None,
        }
    }

    /// Renders the statistics as a report block.
    pub fn render_report(&self) -> String {
        let mut report = String::new();
        let rule = "=".repeat(60);

        let _ = writeln!(report, "{}", rule);
        let _ = writeln!(report, "FILE STATISTICS REPORT");
        let _ = writeln!(report, "{}", rule);
        let _ = writeln!(report, "Total files: {}", self.total_files);
        let _ = writeln!(
            report,
            "Total size: {:.2} MB",
            megabytes(self.total_bytes)
        );

        if !self.categories.is_empty() {
            let _ = writeln!(report);
            let _ = writeln!(report, "Category distribution:");
            let mut by_count: Vec<(&String, &CategoryStat)> = self.categories.iter().collect();
            by_count.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(b.0)));
            for (category, stat) in by_count {
                let _ = writeln!(
                    report,
                    "  {:<15} {:>5} files ({:>8.2} MB)",
                    category,
                    stat.count,
                    megabytes(stat.bytes)
                );
            }
        }

        let top = self.top_extensions(10);
        if !top.is_empty() {
            let _ = writeln!(report);
            let _ = writeln!(report, "Top extensions:");
            for (extension, count) in top {
                let _ = writeln!(report, "  {:<15} {:>5} files", extension, count);
            }
        }

        if let (Some(oldest), Some(newest)) = (self.oldest, self.newest) {
            let _ = writeln!(report);
            let _ = writeln!(
                report,
                "Date range: {} to {} ({} days)",
                oldest.format("%Y-%m-%d"),
                newest.format("%Y-%m-%d"),
                self.span_days().unwrap_or(0)
            );
        }

        let _ = writeln!(report, "{}", rule);
        report
    }
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn record(name: &str, extension: &str, size: u64, day: u32) -> FileRecord {
        let modified = Local.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap();
        FileRecord {
            path: PathBuf::from(format!("/tmp/{}", name)),
            name: name.to_string(),
            extension: extension.to_string(),
            size,
            created: modified,
            modified,
            readable: true,
            writable: true,
            mime_type: None,
            content_preview: None,
            relative_path: String::new(),
            category: None,
            confidence: 0.0,
        }
    }

    fn categorized(mut rec: FileRecord, category: &str) -> FileRecord {
        rec.category = Some(category.to_string());
        rec
    }

    #[test]
    fn test_collect_totals() {
        let records = vec![
            categorized(record("a.pdf", ".pdf", 100, 1), "documents"),
            categorized(record("b.pdf", ".pdf", 200, 5), "documents"),
            categorized(record("c.jpg", ".jpg", 50, 9), "images"),
        ];
        let stats = FileStats::collect(&records);

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_bytes, 350);
        assert_eq!(stats.categories["documents"].count, 2);
        assert_eq!(stats.categories["documents"].bytes, 300);
        assert_eq!(stats.categories["images"].count, 1);
        assert_eq!(stats.extensions[".pdf"], 2);
        assert_eq!(stats.extensions[".jpg"], 1);
    }

    #[test]
    fn test_category_counts_cover_every_file() {
        let records = vec![
            categorized(record("a.pdf", ".pdf", 1, 1), "documents"),
            record("unclassified.xyz", ".xyz", 1, 1),
        ];
        let stats = FileStats::collect(&records);
        let counted: usize = stats.categories.values().map(|s| s.count).sum();
        assert_eq!(counted, stats.total_files);
        assert_eq!(stats.categories[OTHER_CATEGORY].count, 1);
    }

    #[test]
    fn test_missing_extension_bucket() {
        let records = vec![record("Makefile", "", 10, 1)];
        let stats = FileStats::collect(&records);
        assert_eq!(stats.extensions["(no extension)"], 1);
    }

    #[test]
    fn test_top_extensions_order() {
        let records = vec![
            record("a.txt", ".txt", 1, 1),
            record("b.txt", ".txt", 1, 1),
            record("c.jpg", ".jpg", 1, 1),
            record("d.csv", ".csv", 1, 1),
        ];
        let stats = FileStats::collect(&records);
        let top = stats.top_extensions(2);
        assert_eq!(top[0], (".txt", 2));
        // Ties resolve alphabetically.
        assert_eq!(top[1], (".csv", 1));
    }

    #[test]
    fn test_date_range_span() {
        let records = vec![record("old.txt", ".txt", 1, 1), record("new.txt", ".txt", 1, 11)];
        let stats = FileStats::collect(&records);
        assert_eq!(stats.span_days(), Some(10));
    }

    #[test]
    fn test_empty_set() {
        let stats = FileStats::collect(&[]);
        assert_eq!(stats.total_files, 0);
        assert!(stats.oldest.is_none());
        assert_eq!(stats.span_days(), None);
        assert!(stats.top_extensions(5).is_empty());
    }

    #[test]
    fn test_report_mentions_totals() {
        let records = vec![categorized(record("a.pdf", ".pdf", 1024 * 1024, 1), "documents")];
        let report = FileStats::collect(&records).render_report();
        assert!(report.contains("Total files: 1"));
        assert!(report.contains("documents"));
        assert!(report.contains(".pdf"));
    }
}
