//! Multi-signal file categorization.
//!
//! Each file is scored against a table of category rules using five additive
//! signals (extension, MIME type, preview keywords, filename keywords, and a
//! code-content bonus); the highest-scoring category wins. Scoring is
//! deterministic and side-effect-free, and ties resolve to the category that
//! appears first in the table.

use crate::scanner::FileRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Name of the fallback category for files matching no rule.
pub const OTHER_CATEGORY: &str = "other";

/// Category receiving the code-content bonus.
const CODE_CATEGORY: &str = "code";

const EXTENSION_WEIGHT: f64 = 0.4;
const MIME_WEIGHT: f64 = 0.3;
const CONTENT_KEYWORD_WEIGHT: f64 = 0.1;
const FILENAME_KEYWORD_WEIGHT: f64 = 0.2;
const CODE_BONUS: f64 = 0.3;

/// Matching rules for a single category.
///
/// Extensions are lowercase and include the dot; keywords are lowercase
/// substrings matched against file names and content previews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub mime_types: Vec<String>,
}

/// The outcome of classifying a single record.
#[derive(Debug, Clone)]
pub struct Classification {
    pub category: String,
    pub confidence: f64,
    /// Accumulated score per category; only categories that matched at least
    /// one signal appear.
    pub scores: HashMap<String, f64>,
}

/// Scores files against an ordered category table.
///
/// # Examples
///
/// ```no_run
/// use dirsort::classifier::Classifier;
/// use dirsort::scanner::Scanner;
/// use std::path::Path;
///
/// let scanner = Scanner::new();
/// let record = scanner.extract_metadata(Path::new("report.pdf"))?;
/// let classifier = Classifier::new();
/// let result = classifier.categorize(&record);
/// println!("{} ({:.2})", result.category, result.confidence);
/// # Ok::<(), dirsort::scanner::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Classifier {
    categories: Vec<(String, CategoryRule)>,
}

impl Classifier {
    /// Creates a classifier with the built-in category table.
    pub fn new() -> Self {
        Self {
            categories: default_categories(),
        }
    }

    /// Creates a classifier with user overrides merged into the built-in
    /// table.
    ///
    /// An override sharing a name with a built-in category replaces that rule
    /// wholesale while keeping its position in the table; categories with new
    /// names are appended in lexicographic order so classification stays
    /// deterministic regardless of how the overrides were collected.
    pub fn with_overrides(overrides: HashMap<String, CategoryRule>) -> Self {
        let mut categories = default_categories();
        let mut overrides = overrides;

        for (name, rule) in categories.iter_mut() {
            if let Some(replacement) = overrides.remove(name) {
                *rule = replacement;
            }
        }

        let mut extra: Vec<(String, CategoryRule)> = overrides.into_iter().collect();
        extra.sort_by(|a, b| a.0.cmp(&b.0));
        categories.extend(extra);

        Self { categories }
    }

    /// Returns the category names in table (tie-break) order.
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Scores a record against every category and picks the best match.
    ///
    /// Signals accumulate per category:
    /// extension match +0.4, MIME match +0.3, +0.1 per keyword found in the
    /// combined preview-and-filename text, +0.2 for a keyword in the file
    /// name alone, and +0.3 to `code` when the preview looks like source.
    /// The filename participates in both keyword signals on purpose; the
    /// double counting is part of the scoring contract.
    ///
    /// Confidence is the winning score capped at 1.0 and rounded to two
    /// decimals. A record matching nothing maps to `other` with 0.0.
    pub fn categorize(&self, record: &FileRecord) -> Classification {
        let mut scores: HashMap<String, f64> = HashMap::new();

        for (name, rule) in &self.categories {
            if !record.extension.is_empty()
                && rule.extensions.iter().any(|e| e == &record.extension)
            {
                *scores.entry(name.clone()).or_insert(0.0) += EXTENSION_WEIGHT;
            }
        }

        if let Some(mime) = &record.mime_type {
            for (name, rule) in &self.categories {
                if rule.mime_types.iter().any(|m| m == mime) {
                    *scores.entry(name.clone()).or_insert(0.0) += MIME_WEIGHT;
                }
            }
        }

        if let Some(preview) = &record.content_preview {
            let combined = format!(
                "{} {}",
                preview.text.to_lowercase(),
                record.name.to_lowercase()
            );
            for (name, rule) in &self.categories {
                let matches = rule
                    .keywords
                    .iter()
                    .filter(|kw| combined.contains(kw.as_str()))
                    .count();
                if matches > 0 {
                    *scores.entry(name.clone()).or_insert(0.0) +=
                        CONTENT_KEYWORD_WEIGHT * matches as f64;
                }
            }
        }

        let filename = record.name.to_lowercase();
        for (name, rule) in &self.categories {
            if rule.keywords.iter().any(|kw| filename.contains(kw.as_str())) {
                *scores.entry(name.clone()).or_insert(0.0) += FILENAME_KEYWORD_WEIGHT;
            }
        }

        if record
            .content_preview
            .as_ref()
            .is_some_and(|p| p.has_code_keywords)
        {
            *scores.entry(CODE_CATEGORY.to_string()).or_insert(0.0) += CODE_BONUS;
        }

        let (category, confidence) = self.best_match(&scores);
        Classification {
            category,
            confidence,
            scores,
        }
    }

    /// Classifies every record, assigns category and confidence in place,
    /// and groups the records by category.
    ///
    /// This is the one place a record is mutated after the scan.
    pub fn categorize_all(
        &self,
        records: &mut [FileRecord],
    ) -> BTreeMap<String, Vec<FileRecord>> {
        let mut grouped: BTreeMap<String, Vec<FileRecord>> = BTreeMap::new();

        for record in records.iter_mut() {
            let result = self.categorize(record);
            record.category = Some(result.category.clone());
            record.confidence = result.confidence;
            grouped.entry(result.category).or_default().push(record.clone());
        }

        grouped
    }

    /// Picks the highest-scoring category, breaking ties by table order.
    fn best_match(&self, scores: &HashMap<String, f64>) -> (String, f64) {
        let mut best: Option<(&str, f64)> = None;

        for (name, _) in &self.categories {
            if let Some(&score) = scores.get(name.as_str())
                && best.is_none_or(|(_, best_score)| score > best_score)
            {
                best = Some((name, score));
            }
        }

        // The code bonus can score a category absent from the table when
        // overrides renamed it away; scan leftovers in name order.
        let mut leftovers: Vec<(&String, &f64)> = scores
            .iter()
            .filter(|(name, _)| !self.categories.iter().any(|(n, _)| n == *name))
            .collect();
        leftovers.sort_by(|a, b| a.0.cmp(b.0));
        for (name, &score) in leftovers {
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((name, score));
            }
        }

        match best {
            Some((name, score)) if score > 0.0 => {
                let confidence = (score.min(1.0) * 100.0).round() / 100.0;
                (name.to_string(), confidence)
            }
            _ => (OTHER_CATEGORY.to_string(), 0.0),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in category table. Order matters: it is the documented
/// tie-break order for equal scores.
fn default_categories() -> Vec<(String, CategoryRule)> {
    fn rule(extensions: &[&str], keywords: &[&str], mime_types: &[&str]) -> CategoryRule {
        CategoryRule {
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            mime_types: mime_types.iter().map(|s| s.to_string()).collect(),
        }
    }

    vec![
        (
            "documents".to_string(),
            rule(
                &[".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt"],
                &["document", "report", "letter", "memo"],
                &["application/pdf", "application/msword"],
            ),
        ),
        (
            "images".to_string(),
            rule(
                &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".webp"],
                &["image", "photo", "picture", "screenshot"],
                &["image/jpeg", "image/png", "image/gif"],
            ),
        ),
        (
            "videos".to_string(),
            rule(
                &[".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm"],
                &["video", "movie", "clip", "recording"],
                &["video/mp4", "video/avi", "video/x-msvideo"],
            ),
        ),
        (
            "audio".to_string(),
            rule(
                &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a"],
                &["audio", "music", "song", "sound"],
                &["audio/mpeg", "audio/wav", "audio/flac"],
            ),
        ),
        (
            "code".to_string(),
            rule(
                &[
                    ".py", ".js", ".java", ".cpp", ".c", ".html", ".css", ".php", ".rb", ".go",
                    ".rs", ".swift", ".ts",
                ],
                &["code", "program", "script", "function", "class"],
                &["text/x-python", "text/javascript", "text/x-java"],
            ),
        ),
        (
            "archives".to_string(),
            rule(
                &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2"],
                &["archive", "compressed", "zip"],
                &["application/zip", "application/x-rar"],
            ),
        ),
        (
            "spreadsheets".to_string(),
            rule(
                &[".xls", ".xlsx", ".csv", ".ods"],
                &["spreadsheet", "excel", "data", "table"],
                &[
                    "application/vnd.ms-excel",
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                ],
            ),
        ),
        (
            "presentations".to_string(),
            rule(
                &[".ppt", ".pptx", ".odp"],
                &["presentation", "slides", "powerpoint"],
                &["application/vnd.ms-powerpoint"],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ContentPreview;
    use chrono::Local;
    use std::path::PathBuf;

    fn record(name: &str, extension: &str) -> FileRecord {
        let now = Local::now();
        FileRecord {
            path: PathBuf::from(format!("/tmp/{}", name)),
            name: name.to_string(),
            extension: extension.to_string(),
            size: 100,
            created: now,
            modified: now,
            readable: true,
            writable: true,
            mime_type: None,
            content_preview: None,
            relative_path: String::new(),
            category: None,
            confidence: 0.0,
        }
    }

    fn preview(text: &str, has_code: bool) -> ContentPreview {
        ContentPreview {
            text: text.to_string(),
            length: text.chars().count(),
            line_count: text.matches('\n').count() + 1,
            has_code_keywords: has_code,
        }
    }

    #[test]
    fn test_extension_match_scores_point_four() {
        let classifier = Classifier::new();
        let result = classifier.categorize(&record("thing.pdf", ".pdf"));
        assert_eq!(result.category, "documents");
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn test_mime_match_adds_to_score() {
        let classifier = Classifier::new();
        let mut rec = record("thing.pdf", ".pdf");
        rec.mime_type = Some("application/pdf".to_string());
        let result = classifier.categorize(&rec);
        assert_eq!(result.category, "documents");
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn test_filename_keyword_adds_point_two() {
        let classifier = Classifier::new();
        let result = classifier.categorize(&record("report.pdf", ".pdf"));
        // 0.4 extension + 0.2 filename keyword "report"
        assert_eq!(result.category, "documents");
        assert_eq!(result.confidence, 0.6);
    }

    #[test]
    fn test_keyword_double_counts_with_preview() {
        let classifier = Classifier::new();
        let mut rec = record("report.txt", ".txt");
        rec.content_preview = Some(preview("quarterly numbers", false));
        let result = classifier.categorize(&rec);
        // 0.4 extension + 0.1 combined-text "report" + 0.2 filename "report"
        assert_eq!(result.category, "documents");
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn test_code_bonus_applies_to_code_category() {
        let classifier = Classifier::new();
        let mut rec = record("notes.txt", ".txt");
        rec.content_preview = Some(preview("def main():\n    return 0", true));
        let result = classifier.categorize(&rec);
        // documents gets 0.4 from .txt; code gets 0.3 bonus + 0.2 from the
        // "return" keyword counted in the combined text... no keyword match
        // here since "notes.txt" has none and preview keywords don't include
        // category keywords; documents wins.
        assert_eq!(result.category, "documents");
        assert!(result.scores.get("code").copied().unwrap_or(0.0) >= 0.3);
    }

    #[test]
    fn test_unmatched_record_is_other_with_zero_confidence() {
        let classifier = Classifier::new();
        let result = classifier.categorize(&record("mystery.qqq", ".qqq"));
        assert_eq!(result.category, OTHER_CATEGORY);
        assert_eq!(result.confidence, 0.0);
        assert!(result.scores.is_empty());
    }

    #[test]
    fn test_confidence_is_capped_at_one() {
        let classifier = Classifier::new();
        let mut rec = record("photo_image_picture_screenshot.png", ".png");
        rec.mime_type = Some("image/png".to_string());
        rec.content_preview = Some(preview("image photo picture screenshot", false));
        let result = classifier.categorize(&rec);
        assert_eq!(result.category, "images");
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let classifier = Classifier::new();
        let mut rec = record("movie_clip.mp4", ".mp4");
        rec.mime_type = Some("video/mp4".to_string());
        let first = classifier.categorize(&rec);
        let second = classifier.categorize(&rec);
        assert_eq!(first.category, second.category);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn test_tie_breaks_by_table_order() {
        let mut overrides = HashMap::new();
        // Two categories claiming the same extension with no other signals:
        // the earlier table entry must win.
        overrides.insert(
            "documents".to_string(),
            CategoryRule {
                extensions: vec![".note".to_string()],
                ..Default::default()
            },
        );
        overrides.insert(
            "images".to_string(),
            CategoryRule {
                extensions: vec![".note".to_string()],
                ..Default::default()
            },
        );
        let classifier = Classifier::with_overrides(overrides);
        let result = classifier.categorize(&record("x.note", ".note"));
        assert_eq!(result.category, "documents");
    }

    #[test]
    fn test_override_replaces_rule_wholesale() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "documents".to_string(),
            CategoryRule {
                extensions: vec![".scroll".to_string()],
                ..Default::default()
            },
        );
        let classifier = Classifier::with_overrides(overrides);

        // The replaced rule no longer knows about .pdf.
        let pdf = classifier.categorize(&record("x.pdf", ".pdf"));
        assert_ne!(pdf.category, "documents");

        let scroll = classifier.categorize(&record("x.scroll", ".scroll"));
        assert_eq!(scroll.category, "documents");
    }

    #[test]
    fn test_new_override_category_is_appended() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "ebooks".to_string(),
            CategoryRule {
                extensions: vec![".epub".to_string()],
                ..Default::default()
            },
        );
        let classifier = Classifier::with_overrides(overrides);
        assert!(classifier.category_names().contains(&"ebooks"));

        let result = classifier.categorize(&record("novel.epub", ".epub"));
        assert_eq!(result.category, "ebooks");
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn test_categorize_all_assigns_and_groups() {
        let classifier = Classifier::new();
        let mut records = vec![
            record("a.pdf", ".pdf"),
            record("b.jpg", ".jpg"),
            record("c.qqq", ".qqq"),
        ];
        let grouped = classifier.categorize_all(&mut records);

        let total: usize = grouped.values().map(Vec::len).sum();
        assert_eq!(total, records.len());

        assert_eq!(records[0].category.as_deref(), Some("documents"));
        assert_eq!(records[1].category.as_deref(), Some("images"));
        assert_eq!(records[2].category.as_deref(), Some(OTHER_CATEGORY));
        assert!(grouped.contains_key("documents"));
        assert!(grouped.contains_key("images"));
        assert!(grouped.contains_key(OTHER_CATEGORY));
    }
}
