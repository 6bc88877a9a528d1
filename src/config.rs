//! Filtering and category-override configuration.
//!
//! Configuration is loaded from a TOML document (JSON is accepted as an
//! alternative, chosen by file extension) and covers two concerns: filter
//! rules deciding which scanned files take part in a run, and category
//! overrides merged into the classifier's built-in table.
//!
//! # Configuration File Format
//!
//! ```toml
//! [filters]
//! include_hidden = false
//! min_size_bytes = 1024
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp", "node_modules/**"]
//! extensions = ["bak", "tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [categories.ebooks]
//! extensions = [".epub", ".mobi"]
//! keywords = ["novel", "ebook"]
//! mime_types = ["application/epub+zip"]
//! ```

use crate::classifier::CategoryRule;
use crate::scanner::FileRecord;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur during configuration loading and filtering.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML/JSON syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    InvalidRegexPattern { pattern: String, reason: String },
    /// Configuration file extension is neither `.toml` nor `.json`.
    UnsupportedFormat(PathBuf),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(
                    f,
                    "Invalid glob pattern '{}': expected *.ext or dir/**",
                    pattern
                )
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::UnsupportedFormat(path) => {
                write!(
                    f,
                    "Unsupported configuration format: {} (expected .toml or .json)",
                    path.display()
                )
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default)]
    pub filters: FilterRules,

    /// Category overrides merged into the classifier's built-in table.
    /// An override replaces the whole rule for an existing category name.
    #[serde(default)]
    pub categories: HashMap<String, CategoryRule>,
}

/// Root-level filter rules configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to false.
    #[serde(default)]
    pub include_hidden: bool,

    /// Files smaller than this are excluded.
    #[serde(default)]
    pub min_size_bytes: Option<u64>,

    /// Files larger than this are excluded.
    #[serde(default)]
    pub max_size_bytes: Option<u64>,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            include_hidden: false,
            min_size_bytes: None,
            max_size_bytes: None,
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding files from a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp", "node_modules/**").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude, without the dot (e.g., "bak", "tmp").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns to exclude, matched against name and full path.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl OrganizerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.dirsortrc.toml` in the current directory
    /// 3. Look for `~/.config/dirsort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read or has an unsupported extension.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".dirsortrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file, dispatching on its extension.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        match extension.as_str() {
            "toml" => toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string())),
            "json" => {
                serde_json::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
            }
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Folds command-line filter values into the loaded rules. CLI regexes
    /// are appended to the exclude list; size bounds replace the configured
    /// ones when given.
    pub fn apply_cli_filters(
        &mut self,
        min_size: Option<u64>,
        max_size: Option<u64>,
        exclude_regex: &[String],
    ) {
        if min_size.is_some() {
            self.filters.min_size_bytes = min_size;
        }
        if max_size.is_some() {
            self.filters.max_size_bytes = max_size;
        }
        self.filters
            .exclude
            .regex
            .extend(exclude_regex.iter().cloned());
    }

    /// Compile the filter rules into matcher structures.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self.filters.clone())
    }
}

/// Compiled, optimized filter structures for efficient file matching.
///
/// All glob and regex patterns are parsed once at compilation so matching a
/// record is a set lookup plus linear pattern checks.
pub struct CompiledFilters {
    include_hidden: bool,
    min_size_bytes: Option<u64>,
    max_size_bytes: Option<u64>,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| -> Result<Vec<Pattern>, ConfigError> {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect()
        };

        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            min_size_bytes: rules.min_size_bytes,
            max_size_bytes: rules.max_size_bytes,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Whether a scanned record passes the filters and takes part in the
    /// run.
    ///
    /// Checks run in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and not allowed, exclude
    /// 3. Size bounds
    /// 4. Exact filename match - if matched, exclude
    /// 5. File extension match - if matched, exclude
    /// 6. Glob pattern match on relative and absolute path - if matched, exclude
    /// 7. Regex match on name or path - if matched, exclude
    /// 8. Default: include
    pub fn matches(&self, record: &FileRecord) -> bool {
        let relative = if record.relative_path.is_empty() {
            PathBuf::from(&record.name)
        } else {
            Path::new(&record.relative_path).join(&record.name)
        };

        if self.matches_any(&self.include_patterns, &relative, &record.path) {
            return true;
        }

        if !self.include_hidden && record.name.starts_with('.') {
            return false;
        }

        if let Some(min) = self.min_size_bytes
            && record.size < min
        {
            return false;
        }
        if let Some(max) = self.max_size_bytes
            && record.size > max
        {
            return false;
        }

        if self.exclude_filenames.contains(&record.name) {
            return false;
        }

        if !record.extension.is_empty() && self.exclude_extensions.contains(&record.extension) {
            return false;
        }

        if self.matches_any(&self.exclude_patterns, &relative, &record.path) {
            return false;
        }

        let path_text = record.path.to_string_lossy();
        if self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&record.name) || regex.is_match(&path_text))
        {
            return false;
        }

        true
    }

    fn matches_any(&self, patterns: &[Pattern], relative: &Path, absolute: &Path) -> bool {
        patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative) || pattern.matches_path(absolute))
    }
}
