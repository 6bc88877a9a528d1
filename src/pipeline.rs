//! Run orchestration: scan, filter, classify, place, journal.
//!
//! The [`Pipeline`] drives one full organization run as strictly sequential
//! phases over a single batch; each phase materializes its output before the
//! next begins. A cloneable [`CancelFlag`] is polled between phases, so
//! cancellation stops the run from advancing without rolling back work that
//! already happened. The undo journal is appended once, by the pipeline,
//! after a completed non-dry-run placement.

use crate::classifier::Classifier;
use crate::config::{ConfigError, OrganizerConfig};
use crate::duplicates::{DuplicateFinder, DuplicateSummary, HashAlgorithm};
use crate::placement::{PlacementEngine, PlacementOptions, PlacementStats};
use crate::scanner::{FileRecord, ScanError, Scanner};
use crate::stats::FileStats;
use crate::undo::{JournalError, UndoJournal};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Fatal errors checked before or during a run.
#[derive(Debug)]
pub enum PipelineError {
    /// Source and target are the same directory.
    SamePath,
    /// The source directory lies inside the target directory.
    SourceInsideTarget,
    /// The target directory lies inside the source directory.
    TargetInsideSource,
    Scan(ScanError),
    Config(ConfigError),
    Journal(JournalError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SamePath => {
                write!(f, "Source and target directories cannot be the same")
            }
            Self::SourceInsideTarget => {
                write!(f, "Source directory cannot be inside the target directory")
            }
            Self::TargetInsideSource => {
                write!(f, "Target directory cannot be inside the source directory")
            }
            Self::Scan(e) => e.fmt(f),
            Self::Config(e) => e.fmt(f),
            Self::Journal(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scan(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Journal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScanError> for PipelineError {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<JournalError> for PipelineError {
    fn from(e: JournalError) -> Self {
        Self::Journal(e)
    }
}

/// Cooperative cancellation handle shared between the pipeline and its
/// caller. Cancelling stops the pipeline at the next phase boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub source: PathBuf,
    pub target: PathBuf,
    pub recursive: bool,
    pub dry_run: bool,
    pub placement: PlacementOptions,
    pub find_duplicates: bool,
    pub hash_algorithm: HashAlgorithm,
    pub collect_stats: bool,
    pub config: OrganizerConfig,
}

impl PipelineOptions {
    /// Options with everything beyond the two paths at its default.
    pub fn new(source: &Path, target: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            recursive: true,
            dry_run: false,
            placement: PlacementOptions::default(),
            find_duplicates: false,
            hash_algorithm: HashAlgorithm::default(),
            collect_stats: false,
            config: OrganizerConfig::default(),
        }
    }
}

/// What a run did, phase by phase.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Files found by the scan.
    pub scanned: usize,
    /// Files the filters removed before classification.
    pub filtered_out: usize,
    pub category_counts: BTreeMap<String, usize>,
    pub placement: Option<PlacementStats>,
    pub duplicate_groups: Option<BTreeMap<String, Vec<FileRecord>>>,
    pub duplicates: Option<DuplicateSummary>,
    pub stats: Option<FileStats>,
    /// True when the cancel flag stopped the run at a phase boundary.
    pub cancelled: bool,
}

/// One organization run over a source and target directory.
///
/// # Examples
///
/// ```no_run
/// use dirsort::pipeline::{Pipeline, PipelineOptions};
/// use std::path::Path;
///
/// let options = PipelineOptions::new(Path::new("/downloads"), Path::new("/sorted"));
/// let pipeline = Pipeline::new(options);
/// let summary = pipeline.run()?;
/// println!("{} files scanned", summary.scanned);
/// # Ok::<(), dirsort::pipeline::PipelineError>(())
/// ```
pub struct Pipeline {
    options: PipelineOptions,
    cancel: CancelFlag,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            cancel: CancelFlag::default(),
        }
    }

    /// A handle the caller can use to stop the run between phases.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Runs the full pipeline: validate, scan, filter, detect duplicates,
    /// classify, collect statistics, place, journal.
    ///
    /// Per-file failures are contained inside their phase; only path
    /// validation, filter compilation, and journal persistence are fatal.
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.validate_paths()?;
        let filters = self.options.config.compile_filters()?;

        let mut summary = RunSummary::default();

        info!(
            "scanning {} ({})",
            self.options.source.display(),
            if self.options.recursive {
                "recursive"
            } else {
                "top level only"
            }
        );
        let scanner = Scanner::new();
        let mut records = scanner.scan(&self.options.source, self.options.recursive)?;
        summary.scanned = records.len();

        records.retain(|record| filters.matches(record));
        summary.filtered_out = summary.scanned - records.len();
        info!(
            "{} files scanned, {} filtered out",
            summary.scanned, summary.filtered_out
        );

        if self.check_cancelled(&mut summary) {
            return Ok(summary);
        }

        if self.options.find_duplicates {
            let mut finder = DuplicateFinder::new();
            let groups = finder.find_duplicates(&records, self.options.hash_algorithm);
            let duplicate_summary = DuplicateFinder::summarize(&groups);
            info!(
                "duplicate detection ({}): {} groups, {} files, {} wasted bytes",
                self.options.hash_algorithm.name(),
                duplicate_summary.group_count,
                duplicate_summary.total_duplicate_files,
                duplicate_summary.wasted_bytes
            );
            summary.duplicates = Some(duplicate_summary);
            summary.duplicate_groups = Some(groups);

            if self.check_cancelled(&mut summary) {
                return Ok(summary);
            }
        }

        let classifier = Classifier::with_overrides(self.options.config.categories.clone());
        let grouped = classifier.categorize_all(&mut records);
        summary.category_counts = grouped
            .iter()
            .map(|(category, files)| (category.clone(), files.len()))
            .collect();
        info!("classified into {} categories", grouped.len());

        if self.options.collect_stats {
            summary.stats = Some(FileStats::collect(&records));
        }

        if self.check_cancelled(&mut summary) {
            return Ok(summary);
        }

        let engine = PlacementEngine::new(&self.options.target, self.options.dry_run);
        let stats = engine.place(&grouped, &self.options.placement);
        info!(
            "placement: {} total, {} placed, {} skipped, {} errors{}",
            stats.total,
            stats.placed,
            stats.skipped,
            stats.errors,
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        if !self.options.dry_run && !stats.operations.is_empty() {
            let mut journal = UndoJournal::open(&self.options.target)?;
            journal.record("organize", stats.operations.clone())?;
        }
        summary.placement = Some(stats);

        Ok(summary)
    }

    fn check_cancelled(&self, summary: &mut RunSummary) -> bool {
        if self.cancel.is_cancelled() {
            warn!("run cancelled; completed phases are kept as-is");
            summary.cancelled = true;
            return true;
        }
        false
    }

    /// Rejects same, nested, or missing directories up front, before any
    /// phase runs.
    fn validate_paths(&self) -> Result<(), PipelineError> {
        if !self.options.source.is_dir() {
            return Err(PipelineError::Scan(ScanError::InvalidPath {
                path: self.options.source.clone(),
            }));
        }

        let source = self
            .options
            .source
            .canonicalize()
            .map_err(|e| PipelineError::Scan(ScanError::Io {
                path: self.options.source.clone(),
                source: e,
            }))?;
        // The target may not exist yet; normalize without touching disk.
        let target = if self.options.target.exists() {
            self.options
                .target
                .canonicalize()
                .unwrap_or_else(|_| self.options.target.clone())
        } else {
            std::path::absolute(&self.options.target)
                .unwrap_or_else(|_| self.options.target.clone())
        };

        if source == target {
            return Err(PipelineError::SamePath);
        }
        if source.starts_with(&target) {
            return Err(PipelineError::SourceInsideTarget);
        }
        if target.starts_with(&source) {
            return Err(PipelineError::TargetInsideSource);
        }

        Ok(())
    }
}
