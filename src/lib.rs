//! dirsort - classify and relocate files into a structured target tree
//!
//! This library scans a source tree into metadata-rich file records, scores
//! each record against a category table, copies files into an organized
//! target layout with conflict-safe naming, detects exact duplicates, and
//! journals every run so it can be undone.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod placement;
pub mod scanner;
pub mod stats;
pub mod undo;

pub use classifier::{CategoryRule, Classification, Classifier};
pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use duplicates::{DuplicateFinder, DuplicateSummary, HashAlgorithm};
pub use pipeline::{CancelFlag, Pipeline, PipelineError, PipelineOptions, RunSummary};
pub use placement::{
    OperationRecord, OperationStatus, PlacementEngine, PlacementOptions, PlacementStats, Strategy,
};
pub use scanner::{FileRecord, ScanError, Scanner};
pub use stats::FileStats;
pub use undo::{JournalError, UndoEntry, UndoJournal, UndoOutcome};
