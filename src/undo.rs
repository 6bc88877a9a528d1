//! Persisted linear undo journal over placement runs.
//!
//! Each completed placement run is appended as one [`UndoEntry`]; a cursor
//! walks backward through the history one entry per [`UndoJournal::undo`]
//! call. Recording while the cursor is behind the tail discards the entries
//! after it, the usual linear undo/redo semantics. The whole journal is
//! rewritten to disk after every mutation so it survives process restarts.
//!
//! A journal instance is single-threaded by design; wrap it in external
//! locking before sharing it across threads.

use crate::placement::{OperationRecord, OperationStatus};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Name of the history document inside the journal directory.
pub const HISTORY_FILE_NAME: &str = ".dirsort_history.json";

/// Errors raised by journal persistence.
#[derive(Debug)]
pub enum JournalError {
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidFormat {
        reason: String,
    },
}

impl std::fmt::Display for JournalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadFailed { path, source } => {
                write!(f, "Failed to read history {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "Failed to write history {}: {}", path.display(), source)
            }
            Self::InvalidFormat { reason } => {
                write!(f, "Invalid history file format: {}", reason)
            }
        }
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFailed { source, .. } | Self::WriteFailed { source, .. } => Some(source),
            Self::InvalidFormat { .. } => None,
        }
    }
}

/// One journaled placement run, reversible as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoEntry {
    /// Position in history; also the record/undo ordering key.
    pub id: usize,
    pub op_type: String,
    /// RFC 3339 timestamp of when the entry was recorded.
    pub timestamp: String,
    pub operations: Vec<OperationRecord>,
}

/// Outcome of reversing one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoOutcome {
    pub entry_id: usize,
    /// Destination files deleted.
    pub undone: usize,
    /// Deletions that failed; the loop continues past them.
    pub errors: usize,
}

#[derive(Debug, Deserialize)]
struct JournalState {
    entries: Vec<UndoEntry>,
    cursor: usize,
}

#[derive(Serialize)]
struct JournalStateRef<'a> {
    entries: &'a [UndoEntry],
    cursor: usize,
}

/// Linear undo history persisted as pretty JSON.
///
/// The cursor counts entries not yet undone: `entries[cursor - 1]` is the
/// next undo target, and `entries[cursor..]` are undone entries awaiting a
/// redo or truncation.
#[derive(Debug)]
pub struct UndoJournal {
    path: PathBuf,
    entries: Vec<UndoEntry>,
    cursor: usize,
}

impl UndoJournal {
    /// Opens the journal stored in `dir`, starting empty when no history
    /// file exists yet.
    pub fn open(dir: &Path) -> Result<Self, JournalError> {
        let path = dir.join(HISTORY_FILE_NAME);

        if !path.exists() {
            return Ok(Self {
                path,
                entries: Vec::new(),
                cursor: 0,
            });
        }

        let content = fs::read_to_string(&path).map_err(|source| JournalError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let state: JournalState =
            serde_json::from_str(&content).map_err(|e| JournalError::InvalidFormat {
                reason: e.to_string(),
            })?;
        if state.cursor > state.entries.len() {
            return Err(JournalError::InvalidFormat {
                reason: format!(
                    "cursor {} beyond {} entries",
                    state.cursor,
                    state.entries.len()
                ),
            });
        }

        Ok(Self {
            path,
            entries: state.entries,
            cursor: state.cursor,
        })
    }

    /// Appends a new entry, discarding any previously undone entries after
    /// the cursor, and persists. Returns the new entry's id.
    pub fn record(
        &mut self,
        op_type: &str,
        operations: Vec<OperationRecord>,
    ) -> Result<usize, JournalError> {
        self.entries.truncate(self.cursor);

        let id = self.entries.len();
        self.entries.push(UndoEntry {
            id,
            op_type: op_type.to_string(),
            timestamp: Local::now().to_rfc3339(),
            operations,
        });
        self.cursor = self.entries.len();
        self.persist()?;

        Ok(id)
    }

    /// Reverses the entry at the cursor by deleting the destination of every
    /// `placed` operation that still exists, then steps the cursor back and
    /// persists.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. Individual deletion
    /// failures are counted and logged without stopping the loop.
    pub fn undo(&mut self) -> Result<Option<UndoOutcome>, JournalError> {
        if self.cursor == 0 {
            return Ok(None);
        }

        let entry = &self.entries[self.cursor - 1];
        let mut outcome = UndoOutcome {
            entry_id: entry.id,
            undone: 0,
            errors: 0,
        };

        for operation in &entry.operations {
            if operation.status != OperationStatus::Placed {
                continue;
            }
            let Some(destination) = &operation.destination else {
                continue;
            };
            if !destination.exists() {
                continue;
            }
            match fs::remove_file(destination) {
                Ok(()) => outcome.undone += 1,
                Err(e) => {
                    warn!("could not remove {}: {}", destination.display(), e);
                    outcome.errors += 1;
                }
            }
        }

        self.cursor -= 1;
        self.persist()?;
        Ok(Some(outcome))
    }

    /// Steps the cursor forward past the most recently undone entry and
    /// persists.
    ///
    /// This does not replay the copies; callers must re-run placement for
    /// the files to reappear. Returns `Ok(None)` when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> Result<Option<&UndoEntry>, JournalError> {
        if self.cursor == self.entries.len() {
            return Ok(None);
        }

        self.cursor += 1;
        self.persist()?;
        Ok(Some(&self.entries[self.cursor - 1]))
    }

    /// Empties the journal and persists.
    pub fn clear(&mut self) -> Result<(), JournalError> {
        self.entries.clear();
        self.cursor = 0;
        self.persist()
    }

    /// All entries in record order, undone ones included.
    pub fn history(&self) -> &[UndoEntry] {
        &self.entries
    }

    /// Number of entries not yet undone.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    fn persist(&self) -> Result<(), JournalError> {
        let state = JournalStateRef {
            entries: &self.entries,
            cursor: self.cursor,
        };
        let json = serde_json::to_string_pretty(&state).map_err(|e| JournalError::InvalidFormat {
            reason: e.to_string(),
        })?;
        fs::write(&self.path, json).map_err(|source| JournalError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn placed(source: &Path, destination: &Path) -> OperationRecord {
        OperationRecord {
            source: source.to_path_buf(),
            destination: Some(destination.to_path_buf()),
            status: OperationStatus::Placed,
            error: None,
        }
    }

    #[test]
    fn test_open_empty_journal() {
        let temp_dir = TempDir::new().unwrap();
        let journal = UndoJournal::open(temp_dir.path()).unwrap();
        assert!(journal.history().is_empty());
        assert!(!journal.can_undo());
        assert!(!journal.can_redo());
    }

    #[test]
    fn test_undo_with_no_history_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        assert!(journal.undo().unwrap().is_none());
    }

    #[test]
    fn test_record_assigns_sequential_ids_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal.record("organize", Vec::new()).unwrap();
        journal.record("organize", Vec::new()).unwrap();

        assert_eq!(journal.history()[0].id, 0);
        assert_eq!(journal.history()[1].id, 1);
        assert!(temp_dir.path().join(HISTORY_FILE_NAME).exists());

        let reopened = UndoJournal::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.history().len(), 2);
        assert_eq!(reopened.cursor(), 2);
    }

    #[test]
    fn test_undo_deletes_placed_destinations() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        let dest = temp_dir.path().join("copy.txt");
        fs::write(&source, "data").unwrap();
        fs::write(&dest, "data").unwrap();

        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal
            .record("organize", vec![placed(&source, &dest)])
            .unwrap();

        let outcome = journal.undo().unwrap().expect("entry to undo");
        assert_eq!(outcome.undone, 1);
        assert_eq!(outcome.errors, 0);
        assert!(!dest.exists());
        // The source file is never touched by undo.
        assert!(source.exists());
    }

    #[test]
    fn test_undo_skips_non_placed_and_missing_destinations() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        fs::write(&source, "data").unwrap();

        let operations = vec![
            // Already gone from disk.
            placed(&source, &temp_dir.path().join("never_created.txt")),
            OperationRecord {
                source: source.clone(),
                destination: None,
                status: OperationStatus::Skipped,
                error: None,
            },
            OperationRecord {
                source: source.clone(),
                destination: Some(temp_dir.path().join("previewed.txt")),
                status: OperationStatus::Previewed,
                error: None,
            },
        ];

        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal.record("organize", operations).unwrap();

        let outcome = journal.undo().unwrap().expect("entry to undo");
        assert_eq!(outcome.undone, 0);
        assert_eq!(outcome.errors, 0);
    }

    #[test]
    fn test_undo_exhausts_then_reports_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal.record("organize", Vec::new()).unwrap();

        assert!(journal.undo().unwrap().is_some());
        assert!(journal.undo().unwrap().is_none());
    }

    #[test]
    fn test_cursor_survives_reopen_after_undo() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal.record("organize", Vec::new()).unwrap();
        journal.undo().unwrap();
        drop(journal);

        let mut reopened = UndoJournal::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.history().len(), 1);
        assert!(!reopened.can_undo());
        assert!(reopened.undo().unwrap().is_none());
        assert!(reopened.can_redo());
    }

    #[test]
    fn test_redo_advances_without_replaying() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.txt");
        let dest = temp_dir.path().join("copy.txt");
        fs::write(&source, "data").unwrap();
        fs::write(&dest, "data").unwrap();

        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal
            .record("organize", vec![placed(&source, &dest)])
            .unwrap();
        journal.undo().unwrap();

        let entry = journal.redo().unwrap().expect("entry to redo");
        assert_eq!(entry.id, 0);
        // Redo moves the cursor only; the file does not come back.
        assert!(!dest.exists());
        assert!(journal.redo().unwrap().is_none());
    }

    #[test]
    fn test_record_truncates_undone_entries() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal.record("first", Vec::new()).unwrap();
        journal.record("second", Vec::new()).unwrap();
        journal.undo().unwrap();

        journal.record("third", Vec::new()).unwrap();

        let types: Vec<&str> = journal
            .history()
            .iter()
            .map(|e| e.op_type.as_str())
            .collect();
        assert_eq!(types, vec!["first", "third"]);
        assert_eq!(journal.history()[1].id, 1);
        assert!(!journal.can_redo());
    }

    #[test]
    fn test_clear_empties_history() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal = UndoJournal::open(temp_dir.path()).unwrap();
        journal.record("organize", Vec::new()).unwrap();
        journal.clear().unwrap();

        assert!(journal.history().is_empty());
        let reopened = UndoJournal::open(temp_dir.path()).unwrap();
        assert!(reopened.history().is_empty());
    }

    #[test]
    fn test_corrupt_history_is_invalid_format() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(HISTORY_FILE_NAME), "not json").unwrap();
        let result = UndoJournal::open(temp_dir.path());
        assert!(matches!(result, Err(JournalError::InvalidFormat { .. })));
    }

    #[test]
    fn test_cursor_beyond_entries_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(HISTORY_FILE_NAME),
            r#"{"entries": [], "cursor": 3}"#,
        )
        .unwrap();
        let result = UndoJournal::open(temp_dir.path());
        assert!(matches!(result, Err(JournalError::InvalidFormat { .. })));
    }
}
