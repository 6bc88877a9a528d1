//! Duplicate detection via size-then-hash grouping.
//!
//! Files are first grouped by exact byte size (a cheap pre-filter), then the
//! survivors are stream-hashed in fixed-size chunks and grouped by digest.
//! Digests are cached per path and algorithm for the lifetime of the finder,
//! so repeated detection passes over an unchanged set do not re-read files.

use crate::scanner::FileRecord;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default chunk size for streaming file hashes (8 KiB).
const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Content digest used for duplicate grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// Fast 256-bit digest, the default.
    #[default]
    Blake3,
    /// Slower but universally recognized alternative.
    Sha256,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

/// Summary of a detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateSummary {
    pub group_count: usize,
    pub total_duplicate_files: usize,
    /// Bytes occupied by redundant copies: per group, size × (members − 1).
    pub wasted_bytes: u64,
}

/// Finds exact duplicates in a scanned file set.
///
/// The digest cache lives as long as the finder instance; create a fresh
/// finder per detection run, or keep one around and [`clear_cache`] when the
/// underlying files may have changed.
///
/// [`clear_cache`]: DuplicateFinder::clear_cache
///
/// # Examples
///
/// ```no_run
/// use dirsort::duplicates::{DuplicateFinder, HashAlgorithm};
/// use dirsort::scanner::Scanner;
/// use std::path::Path;
///
/// let records = Scanner::new().scan(Path::new("/data"), true)?;
/// let mut finder = DuplicateFinder::new();
/// let groups = finder.find_duplicates(&records, HashAlgorithm::Blake3);
/// println!("{} duplicate groups", groups.len());
/// # Ok::<(), dirsort::scanner::ScanError>(())
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    chunk_size: usize,
    cache: HashMap<(PathBuf, HashAlgorithm), String>,
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicateFinder {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache: HashMap::new(),
        }
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            cache: HashMap::new(),
        }
    }

    /// Groups records that share identical content, keyed by hex digest.
    ///
    /// Empty files and files with a unique size are dropped by the size
    /// pre-filter without ever being read. A file whose hashing fails is
    /// logged and excluded; the pass itself never fails. Groups of size 1
    /// are discarded.
    pub fn find_duplicates(
        &mut self,
        records: &[FileRecord],
        algorithm: HashAlgorithm,
    ) -> BTreeMap<String, Vec<FileRecord>> {
        let mut by_size: BTreeMap<u64, Vec<&FileRecord>> = BTreeMap::new();
        for record in records {
            if record.size > 0 {
                by_size.entry(record.size).or_default().push(record);
            }
        }

        let mut by_digest: BTreeMap<String, Vec<FileRecord>> = BTreeMap::new();
        for candidates in by_size.into_values().filter(|group| group.len() > 1) {
            for record in candidates {
                match self.hash_file(&record.path, algorithm) {
                    Ok(digest) => by_digest.entry(digest).or_default().push(record.clone()),
                    Err(e) => {
                        warn!("could not hash {}: {}", record.path.display(), e);
                    }
                }
            }
        }

        by_digest.retain(|_, group| group.len() > 1);
        by_digest
    }

    /// Streams the file through the chosen digest in fixed-size chunks,
    /// consulting the per-path cache first.
    pub fn hash_file(
        &mut self,
        path: &Path,
        algorithm: HashAlgorithm,
    ) -> std::io::Result<String> {
        let key = (path.to_path_buf(), algorithm);
        if let Some(digest) = self.cache.get(&key) {
            return Ok(digest.clone());
        }

        let mut file = fs::File::open(path)?;
        let mut buffer = vec![0u8; self.chunk_size];

        let digest = match algorithm {
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let n = file.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                hasher.finalize().to_hex().to_string()
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let n = file.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                hex::encode(hasher.finalize())
            }
        };

        self.cache.insert(key, digest.clone());
        Ok(digest)
    }

    /// Drops all cached digests.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Totals up a detection result.
    ///
    /// Every member of a digest group shares one size (guaranteed by the
    /// size pre-filter), so wasted space per group is size × (members − 1).
    pub fn summarize(groups: &BTreeMap<String, Vec<FileRecord>>) -> DuplicateSummary {
        let mut summary = DuplicateSummary {
            group_count: groups.len(),
            ..Default::default()
        };

        for group in groups.values() {
            summary.total_duplicate_files += group.len();
            if let Some(first) = group.first() {
                summary.wasted_bytes += first.size * (group.len() as u64 - 1);
            }
        }

        summary
    }
}
