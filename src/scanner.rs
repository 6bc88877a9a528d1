//! Directory scanning and file metadata extraction.
//!
//! This module walks a source tree and produces one [`FileRecord`] per regular
//! file, combining filesystem metadata, MIME detection and a short content
//! preview for text-like files. Records feed both the classifier and the
//! duplicate finder.

use chrono::{DateTime, Local};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Extensions that get a content preview during scanning.
const TEXT_PREVIEW_EXTENSIONS: &[&str] = &[
    ".txt", ".py", ".js", ".java", ".cpp", ".c", ".html", ".css", ".md", ".json", ".xml", ".csv",
    ".log",
];

/// Keywords whose presence in a preview marks a file as source-code-like.
const CODE_KEYWORDS: &[&str] = &[
    "def ", "function", "class ", "import ", "public ", "private ", "void ", "int ", "return ",
    "if ", "else ",
];

/// Default number of bytes read for a content preview.
const DEFAULT_PREVIEW_BUDGET: usize = 500;

/// Errors that can occur while scanning a directory tree.
#[derive(Debug)]
pub enum ScanError {
    /// The scan root does not exist or is not a directory.
    InvalidPath { path: PathBuf },
    /// A file vanished between listing and stating it.
    FileNotFound { path: PathBuf },
    /// Any other I/O failure while reading file metadata.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath { path } => {
                write!(f, "Invalid scan root {}: not a directory", path.display())
            }
            Self::FileNotFound { path } => {
                write!(f, "File disappeared during scan: {}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Failed to read metadata for {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A short look into the beginning of a text-like file.
#[derive(Debug, Clone)]
pub struct ContentPreview {
    /// The preview text, decoded lossily from the first bytes of the file.
    pub text: String,
    /// Number of characters in the preview.
    pub length: usize,
    /// Newline count plus one.
    pub line_count: usize,
    /// Whether the preview contains common programming keywords.
    pub has_code_keywords: bool,
}

/// Extracted metadata and derived classification for one scanned file.
///
/// Records are created by [`Scanner::scan`]; the classifier later assigns
/// `category` and `confidence` exactly once. All other fields are read-only
/// after creation.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    /// Lowercase extension including the dot, or empty.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Creation time; falls back to the modification time on platforms
    /// without a birth timestamp.
    pub created: DateTime<Local>,
    /// Last modification time.
    pub modified: DateTime<Local>,
    /// Whether the file could be opened for reading.
    pub readable: bool,
    /// Whether the file is writable.
    pub writable: bool,
    /// Detected MIME type, if any.
    pub mime_type: Option<String>,
    /// Content preview for text-like files.
    pub content_preview: Option<ContentPreview>,
    /// Directory portion of the path relative to the scan root, empty for
    /// root-level files.
    pub relative_path: String,
    /// Category assigned by the classifier.
    pub category: Option<String>,
    /// Classification confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

/// Walks directory trees and extracts file metadata.
///
/// # Examples
///
/// ```no_run
/// use dirsort::scanner::Scanner;
/// use std::path::Path;
///
/// let scanner = Scanner::new();
/// let records = scanner.scan(Path::new("/home/user/Downloads"), true)?;
/// println!("found {} files", records.len());
/// # Ok::<(), dirsort::scanner::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    preview_budget: usize,
}

impl Scanner {
    /// Creates a scanner with the default 500-byte preview budget.
    pub fn new() -> Self {
        Self {
            preview_budget: DEFAULT_PREVIEW_BUDGET,
        }
    }

    /// Creates a scanner reading at most `budget` bytes per content preview.
    pub fn with_preview_budget(budget: usize) -> Self {
        Self {
            preview_budget: budget,
        }
    }

    /// Scans a directory and collects a record per regular file.
    ///
    /// The walk is depth-unbounded when `recursive` is true, otherwise only
    /// direct children are visited. Entries are visited in file-name order so
    /// repeated scans of an unchanged tree produce identical output. A file
    /// that fails metadata extraction is logged and skipped; the scan itself
    /// only fails when `root` is missing or not a directory.
    pub fn scan(&self, root: &Path, recursive: bool) -> Result<Vec<FileRecord>, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::InvalidPath {
                path: root.to_path_buf(),
            });
        }

        let root = root.canonicalize().map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut records = Vec::new();

        for entry in WalkDir::new(&root)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.extract_metadata(entry.path()) {
                Ok(mut record) => {
                    record.relative_path = relative_dir(entry.path(), &root);
                    records.push(record);
                }
                Err(e) => {
                    warn!("skipping {}: {}", entry.path().display(), e);
                }
            }
        }

        Ok(records)
    }

    /// Extracts metadata for a single file.
    ///
    /// Returns [`ScanError::FileNotFound`] when the file no longer exists,
    /// which the scan loop treats as a per-file skip rather than a failure.
    pub fn extract_metadata(&self, path: &Path) -> Result<FileRecord, ScanError> {
        let metadata = fs::metadata(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ScanError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ScanError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        let modified: DateTime<Local> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Local::now());
        let created: DateTime<Local> = metadata
            .created()
            .map(DateTime::from)
            .unwrap_or(modified);

        let readable = fs::File::open(path).is_ok();
        let writable = !metadata.permissions().readonly();

        let mime_type = detect_mime_type(path, &extension);

        let content_preview = if TEXT_PREVIEW_EXTENSIONS.contains(&extension.as_str()) {
            self.read_preview(path)
        } else {
            None
        };

        Ok(FileRecord {
            path: path.to_path_buf(),
            name,
            extension,
            size: metadata.len(),
            created,
            modified,
            readable,
            writable,
            mime_type,
            content_preview,
            relative_path: String::new(),
            category: None,
            confidence: 0.0,
        })
    }

    /// Reads the first bytes of a text-like file.
    ///
    /// Any read failure yields `None`; a missing preview is never an error.
    fn read_preview(&self, path: &Path) -> Option<ContentPreview> {
        let mut file = fs::File::open(path).ok()?;
        let mut buffer = vec![0u8; self.preview_budget];
        let mut total = 0;
        while total < buffer.len() {
            match file.read(&mut buffer[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(_) => return None,
            }
        }
        buffer.truncate(total);

        let text = String::from_utf8_lossy(&buffer).to_string();
        let lowercased = text.to_lowercase();

        Some(ContentPreview {
            length: text.chars().count(),
            line_count: text.matches('\n').count() + 1,
            has_code_keywords: CODE_KEYWORDS.iter().any(|kw| lowercased.contains(kw)),
            text,
        })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the directory portion of `path` relative to `root`.
///
/// Falls back to an empty string when the file is outside the root, e.g.
/// after symlink resolution.
fn relative_dir(path: &Path, root: &Path) -> String {
    path.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| rel.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Detects the MIME type of a file.
///
/// Tries magic-number sniffing first and falls back to an extension lookup;
/// both failing yields `None`.
fn detect_mime_type(path: &Path, extension: &str) -> Option<String> {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => Some(kind.mime_type().to_string()),
        _ => mime_from_extension(extension).map(str::to_string),
    }
}

/// Extension-based MIME guesses for formats `infer` cannot sniff, mostly
/// plain-text ones without magic numbers.
fn mime_from_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension {
        ".txt" | ".log" => "text/plain",
        ".md" => "text/markdown",
        ".html" | ".htm" => "text/html",
        ".css" => "text/css",
        ".csv" => "text/csv",
        ".json" => "application/json",
        ".xml" => "application/xml",
        ".pdf" => "application/pdf",
        ".rtf" => "application/rtf",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".svg" => "image/svg+xml",
        ".bmp" => "image/bmp",
        ".webp" => "image/webp",
        ".mp3" => "audio/mpeg",
        ".wav" => "audio/wav",
        ".flac" => "audio/flac",
        ".ogg" => "audio/ogg",
        ".mp4" => "video/mp4",
        ".mkv" => "video/x-matroska",
        ".avi" => "video/x-msvideo",
        ".mov" => "video/quicktime",
        ".webm" => "video/webm",
        ".zip" => "application/zip",
        ".tar" => "application/x-tar",
        ".gz" => "application/gzip",
        ".7z" => "application/x-7z-compressed",
        ".py" => "text/x-python",
        ".js" => "text/javascript",
        ".java" => "text/x-java",
        ".c" => "text/x-c",
        ".cpp" => "text/x-c++src",
        ".rs" => "text/x-rust",
        ".sh" => "text/x-shellscript",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".xls" => "application/vnd.ms-excel",
        ".xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ".ppt" => "application/vnd.ms-powerpoint",
        ".pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        _ => return None,
    };
    Some(mime)
}
