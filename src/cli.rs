//! Command-line interface.
//!
//! Defines the `organize`, `undo`, `redo`, and `history` subcommands and
//! wires them to the pipeline and journal. The organization run itself
//! executes on a worker thread so the terminal stays responsive; all user
//! output flows through [`OutputFormatter`].

use crate::config::OrganizerConfig;
use crate::duplicates::HashAlgorithm;
use crate::output::OutputFormatter;
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::placement::{PlacementOptions, Strategy};
use crate::undo::UndoJournal;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::thread;

#[derive(Debug, Parser)]
#[command(
    name = "dirsort",
    version,
    about = "Classify and relocate files into a structured target tree"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a source tree and copy its files into an organized target tree.
    Organize {
        /// Directory to scan.
        source: PathBuf,
        /// Directory the organized copies land in.
        target: PathBuf,
        /// Compute the full plan without copying anything.
        #[arg(long)]
        dry_run: bool,
        /// Top-level bucketing strategy.
        #[arg(long, value_enum, default_value_t = StrategyArg::Category)]
        strategy: StrategyArg,
        /// Do not create extension subdirectories inside buckets.
        #[arg(long)]
        no_subdirs: bool,
        /// Do not replicate the source folder layout above category buckets.
        #[arg(long)]
        flat: bool,
        /// Scan only the top level of the source directory.
        #[arg(long)]
        no_recurse: bool,
        /// Configuration file (.toml or .json).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip files smaller than this many bytes.
        #[arg(long)]
        min_size: Option<u64>,
        /// Skip files larger than this many bytes.
        #[arg(long)]
        max_size: Option<u64>,
        /// Exclude files whose name or path matches this regex (repeatable).
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        /// Report groups of files with identical content.
        #[arg(long)]
        find_duplicates: bool,
        /// Digest used for duplicate detection.
        #[arg(long, value_enum, default_value_t = HashArg::Blake3)]
        hash: HashArg,
        /// Print a file statistics report.
        #[arg(long)]
        stats: bool,
    },
    /// Delete the files the most recent run copied into TARGET.
    Undo {
        /// Target directory of a previous organize run.
        target: PathBuf,
    },
    /// Step the journal cursor forward past the last undone run.
    Redo {
        /// Target directory of a previous organize run.
        target: PathBuf,
    },
    /// List the recorded runs in TARGET's journal.
    History {
        /// Target directory of a previous organize run.
        target: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Category,
    Date,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Category => Strategy::Category,
            StrategyArg::Date => Strategy::Date,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HashArg {
    Blake3,
    Sha256,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Blake3 => HashAlgorithm::Blake3,
            HashArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

/// Dispatches a parsed command, returning the process exit code.
pub fn run(cli: Cli) -> i32 {
    let result = match cli.command {
        command @ Command::Organize { .. } => run_organize(command),
        Command::Undo { target } => run_undo(&target),
        Command::Redo { target } => run_redo(&target),
        Command::History { target } => run_history(&target),
    };

    match result {
        Ok(()) => 0,
        Err(message) => {
            OutputFormatter::error(&message);
            1
        }
    }
}

fn run_organize(command: Command) -> Result<(), String> {
    let Command::Organize {
        source,
        target,
        dry_run,
        strategy,
        no_subdirs,
        flat,
        no_recurse,
        config,
        min_size,
        max_size,
        exclude,
        find_duplicates,
        hash,
        stats,
    } = command
    else {
        unreachable!("run_organize called with a non-organize command");
    };

    let mut organizer_config = OrganizerConfig::load(config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    organizer_config.apply_cli_filters(min_size, max_size, &exclude);

    let options = PipelineOptions {
        source: source.clone(),
        target,
        recursive: !no_recurse,
        dry_run,
        placement: PlacementOptions {
            strategy: strategy.into(),
            subcategorize: !no_subdirs,
            preserve_structure: !flat,
        },
        find_duplicates,
        hash_algorithm: hash.into(),
        collect_stats: stats,
        config: organizer_config,
    };

    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing {}", source.display()));
    } else {
        OutputFormatter::info(&format!("Organizing {}", source.display()));
    }

    // The run happens on a worker thread; the spinner's tick thread keeps
    // the terminal alive while this thread blocks on the join.
    let pipeline = Pipeline::new(options);
    let spinner = OutputFormatter::create_spinner("organizing files");
    let worker = thread::spawn(move || pipeline.run());
    let outcome = worker.join();
    spinner.finish_and_clear();

    let summary = outcome
        .map_err(|_| "Organization worker panicked".to_string())?
        .map_err(|e| e.to_string())?;

    OutputFormatter::run_summary(&summary);
    if !dry_run {
        OutputFormatter::success("Organization complete. Use 'dirsort undo <TARGET>' to revert.");
    }
    Ok(())
}

fn run_undo(target: &std::path::Path) -> Result<(), String> {
    let mut journal = UndoJournal::open(target).map_err(|e| e.to_string())?;
    match journal.undo().map_err(|e| e.to_string())? {
        Some(outcome) => {
            OutputFormatter::success(&format!(
                "Undid run #{}: removed {} files ({} errors)",
                outcome.entry_id, outcome.undone, outcome.errors
            ));
            if outcome.errors > 0 {
                OutputFormatter::warning("Some files could not be removed; see the run log.");
            }
            Ok(())
        }
        None => {
            OutputFormatter::info("Nothing to undo.");
            Ok(())
        }
    }
}

fn run_redo(target: &std::path::Path) -> Result<(), String> {
    let mut journal = UndoJournal::open(target).map_err(|e| e.to_string())?;
    match journal.redo().map_err(|e| e.to_string())? {
        Some(entry) => {
            OutputFormatter::warning(&format!(
                "Advanced past run #{}; redo does not copy files back. Re-run organize to restore them.",
                entry.id
            ));
            Ok(())
        }
        None => {
            OutputFormatter::info("Nothing to redo.");
            Ok(())
        }
    }
}

fn run_history(target: &std::path::Path) -> Result<(), String> {
    let journal = UndoJournal::open(target).map_err(|e| e.to_string())?;
    OutputFormatter::history_listing(journal.history(), journal.cursor());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organize_defaults() {
        let cli = Cli::try_parse_from(["dirsort", "organize", "/src", "/dst"]).unwrap();
        let Command::Organize {
            dry_run,
            strategy,
            no_subdirs,
            flat,
            no_recurse,
            exclude,
            ..
        } = cli.command
        else {
            panic!("expected organize");
        };
        assert!(!dry_run);
        assert!(matches!(strategy, StrategyArg::Category));
        assert!(!no_subdirs);
        assert!(!flat);
        assert!(!no_recurse);
        assert!(exclude.is_empty());
    }

    #[test]
    fn test_organize_flags() {
        let cli = Cli::try_parse_from([
            "dirsort",
            "organize",
            "/src",
            "/dst",
            "--dry-run",
            "--strategy",
            "date",
            "--no-subdirs",
            "--exclude",
            "^tmp",
            "--exclude",
            r"\.bak$",
            "--min-size",
            "100",
            "--find-duplicates",
            "--hash",
            "sha256",
            "--stats",
        ])
        .unwrap();
        let Command::Organize {
            dry_run,
            strategy,
            no_subdirs,
            exclude,
            min_size,
            find_duplicates,
            hash,
            stats,
            ..
        } = cli.command
        else {
            panic!("expected organize");
        };
        assert!(dry_run);
        assert!(matches!(strategy, StrategyArg::Date));
        assert!(no_subdirs);
        assert_eq!(exclude.len(), 2);
        assert_eq!(min_size, Some(100));
        assert!(find_duplicates);
        assert!(matches!(hash, HashArg::Sha256));
        assert!(stats);
    }

    #[test]
    fn test_journal_subcommands_parse() {
        for name in ["undo", "redo", "history"] {
            let cli = Cli::try_parse_from(["dirsort", name, "/dst"]).unwrap();
            match (name, cli.command) {
                ("undo", Command::Undo { target })
                | ("redo", Command::Redo { target })
                | ("history", Command::History { target }) => {
                    assert_eq!(target, PathBuf::from("/dst"));
                }
                _ => panic!("unexpected parse for {}", name),
            }
        }
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["dirsort"]).is_err());
    }
}
