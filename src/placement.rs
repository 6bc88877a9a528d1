//! Conflict-aware file placement.
//!
//! Given category-grouped records, the [`PlacementEngine`] computes a
//! destination for each file (by category or date bucket, with optional
//! extension subdirectories and source-structure preservation), resolves
//! naming conflicts with numeric suffixes, and copies the file. Sources are
//! never deleted. Every attempt is recorded as an [`OperationRecord`] so a
//! run can be journaled and undone later.

use crate::scanner::FileRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, warn};

/// Upper bound on numeric conflict suffixes before a file is skipped.
const MAX_CONFLICT_ATTEMPTS: u32 = 1000;

/// Top-level bucketing strategy for destination paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Bucket by assigned category name.
    #[default]
    Category,
    /// Bucket by `YYYY-MM` of the file's modification time.
    Date,
}

/// How one placement attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// The file was copied to its destination.
    Placed,
    /// No destination could be found (conflict resolution exhausted).
    Skipped,
    /// The copy failed.
    Error,
    /// Dry-run mode; the destination was computed but nothing was copied.
    Previewed,
}

/// One file placement attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub source: PathBuf,
    /// `None` when the attempt failed before a destination was settled.
    pub destination: Option<PathBuf>,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Options controlling destination computation.
#[derive(Debug, Clone)]
pub struct PlacementOptions {
    pub strategy: Strategy,
    /// Create an extension subdirectory beneath each bucket.
    pub subcategorize: bool,
    /// Replicate the source tree's relative layout above category buckets.
    /// Ignored by the date strategy.
    pub preserve_structure: bool,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Category,
            subcategorize: true,
            preserve_structure: true,
        }
    }
}

/// Aggregated outcome of one placement run.
///
/// `placed` counts both live copies and dry-run previews, so a dry run and a
/// live run over the same inputs report identical numbers.
#[derive(Debug, Clone, Default)]
pub struct PlacementStats {
    pub total: usize,
    pub placed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Every attempt, in placement order.
    pub operations: Vec<OperationRecord>,
}

impl PlacementStats {
    fn count(&mut self, record: OperationRecord) {
        self.total += 1;
        match record.status {
            OperationStatus::Placed | OperationStatus::Previewed => self.placed += 1,
            OperationStatus::Skipped => self.skipped += 1,
            OperationStatus::Error => self.errors += 1,
        }
        self.operations.push(record);
    }
}

/// Copies categorized files into a structured target tree.
///
/// # Examples
///
/// ```no_run
/// use dirsort::placement::{PlacementEngine, PlacementOptions};
/// use std::collections::BTreeMap;
/// use std::path::Path;
///
/// let engine = PlacementEngine::new(Path::new("/out"), false);
/// let stats = engine.place(&BTreeMap::new(), &PlacementOptions::default());
/// assert_eq!(stats.total, 0);
/// ```
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    target: PathBuf,
    dry_run: bool,
}

impl PlacementEngine {
    pub fn new(target: &Path, dry_run: bool) -> Self {
        Self {
            target: target.to_path_buf(),
            dry_run,
        }
    }

    /// Places every record of every category group and reports the outcome.
    ///
    /// Per-file copy failures become `error` records; the batch never aborts.
    /// In dry-run mode each step except directory creation and the copy
    /// itself still happens, producing `previewed` records, and a claimed-set
    /// keeps the planned destinations collision-free so the preview matches
    /// what a live run would do.
    pub fn place(
        &self,
        categorized: &BTreeMap<String, Vec<FileRecord>>,
        options: &PlacementOptions,
    ) -> PlacementStats {
        let mut stats = PlacementStats::default();
        // Destinations taken during this run, including previewed ones.
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for (category, records) in categorized {
            for record in records {
                let dest_dir = self.destination_dir(category, record, options);
                let primary = dest_dir.join(&record.name);

                let Some(destination) = self.resolve_conflict(&primary, &claimed) else {
                    warn!(
                        "too many name conflicts for {}, skipping",
                        record.path.display()
                    );
                    stats.count(OperationRecord {
                        source: record.path.clone(),
                        destination: None,
                        status: OperationStatus::Skipped,
                        error: Some(format!(
                            "no free name after {} attempts",
                            MAX_CONFLICT_ATTEMPTS
                        )),
                    });
                    continue;
                };

                claimed.insert(destination.clone());

                if self.dry_run {
                    info!(
                        "[dry run] would copy {} -> {}",
                        record.path.display(),
                        destination.display()
                    );
                    stats.count(OperationRecord {
                        source: record.path.clone(),
                        destination: Some(destination),
                        status: OperationStatus::Previewed,
                        error: None,
                    });
                    continue;
                }

                match self.copy_file(record, &destination) {
                    Ok(()) => {
                        info!(
                            "copied {} -> {}",
                            record.path.display(),
                            destination.display()
                        );
                        stats.count(OperationRecord {
                            source: record.path.clone(),
                            destination: Some(destination),
                            status: OperationStatus::Placed,
                            error: None,
                        });
                    }
                    Err(e) => {
                        warn!("failed to copy {}: {}", record.path.display(), e);
                        stats.count(OperationRecord {
                            source: record.path.clone(),
                            destination: Some(destination),
                            status: OperationStatus::Error,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }
        }

        stats
    }

    /// Computes the directory a record's copy belongs in.
    ///
    /// Date strategy replaces category buckets at the top level; structure
    /// preservation slots the original relative path above the category.
    fn destination_dir(
        &self,
        category: &str,
        record: &FileRecord,
        options: &PlacementOptions,
    ) -> PathBuf {
        let mut dir = match options.strategy {
            Strategy::Date => self
                .target
                .join(record.modified.format("%Y-%m").to_string()),
            Strategy::Category => {
                if options.preserve_structure && !record.relative_path.is_empty() {
                    self.target.join(&record.relative_path).join(category)
                } else {
                    self.target.join(category)
                }
            }
        };

        if options.subcategorize {
            dir = dir.join(extension_subdir(&record.extension));
        }

        dir
    }

    /// Finds a destination that collides with nothing on disk and nothing
    /// already claimed in this run, appending `_1`, `_2`, ... before the
    /// extension. Returns `None` once the attempt cap is hit.
    fn resolve_conflict(&self, primary: &Path, claimed: &HashSet<PathBuf>) -> Option<PathBuf> {
        let taken = |p: &Path| p.exists() || claimed.contains(p);

        if !taken(primary) {
            return Some(primary.to_path_buf());
        }

        let stem = primary
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let suffix = primary
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let parent = primary.parent().unwrap_or(Path::new(""));

        for counter in 1..=MAX_CONFLICT_ATTEMPTS {
            let candidate = parent.join(format!("{}_{}{}", stem, counter, suffix));
            if !taken(&candidate) {
                return Some(candidate);
            }
        }

        None
    }

    /// Copies the source to its destination, creating parent directories on
    /// demand and carrying the modification time over best-effort.
    fn copy_file(&self, record: &FileRecord, destination: &Path) -> std::io::Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&record.path, destination)?;
        restore_mtime(destination, record.modified.into());
        Ok(())
    }
}

/// Sets the destination's modification time; failures are ignored since a
/// missed timestamp is not worth failing the copy over.
fn restore_mtime(path: &Path, mtime: SystemTime) {
    if let Ok(file) = fs::File::options().write(true).open(path) {
        let _ = file.set_modified(mtime);
    }
}

/// Maps a lowercased extension to its subdirectory name, `other` when
/// unmapped.
pub fn extension_subdir(extension: &str) -> &'static str {
    match extension {
        // documents
        ".pdf" => "pdf",
        ".doc" => "doc",
        ".docx" => "docx",
        ".txt" => "txt",
        ".rtf" => "rtf",
        ".odt" => "odt",
        ".xls" => "xls",
        ".xlsx" => "xlsx",
        ".ppt" => "ppt",
        ".pptx" => "pptx",
        ".csv" => "csv",
        ".ods" => "ods",
        ".odp" => "odp",
        // images
        ".jpg" => "jpg",
        ".jpeg" => "jpeg",
        ".png" => "png",
        ".gif" => "gif",
        ".bmp" => "bmp",
        ".svg" => "svg",
        ".webp" => "webp",
        ".ico" => "ico",
        ".tiff" => "tiff",
        ".tif" => "tif",
        // videos
        ".mp4" => "mp4",
        ".avi" => "avi",
        ".mkv" => "mkv",
        ".mov" => "mov",
        ".wmv" => "wmv",
        ".flv" => "flv",
        ".webm" => "webm",
        ".mpg" => "mpg",
        ".mpeg" => "mpeg",
        // audio
        ".mp3" => "mp3",
        ".wav" => "wav",
        ".flac" => "flac",
        ".aac" => "aac",
        ".ogg" => "ogg",
        ".m4a" => "m4a",
        ".wma" => "wma",
        // code
        ".py" => "python",
        ".js" => "javascript",
        ".java" => "java",
        ".cpp" => "cpp",
        ".c" => "c",
        ".html" => "html",
        ".css" => "css",
        ".php" => "php",
        ".rb" => "ruby",
        ".go" => "go",
        ".rs" => "rust",
        ".swift" => "swift",
        ".ts" => "typescript",
        ".jsx" => "jsx",
        ".tsx" => "tsx",
        ".json" => "json",
        ".xml" => "xml",
        // archives
        ".zip" => "zip",
        ".rar" => "rar",
        ".7z" => "7z",
        ".tar" => "tar",
        ".gz" => "gz",
        ".bz2" => "bz2",
        ".xz" => "xz",
        _ => "other",
    }
}
