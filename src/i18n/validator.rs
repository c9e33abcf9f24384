//! Translation quality validation.
//!
//! Checks that a translated string keeps the pieces the landing page relies
//! on: `{{placeholders}}` used for interpolation, URLs and inline HTML tags.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Problems that break rendering (e.g. a lost placeholder)
    pub errors: Vec<String>,

    /// Non-critical differences worth a look
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for translation quality.
pub struct TranslationValidator;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("validator pattern is valid"))
}

impl TranslationValidator {
    /// Compare a translation against its base-locale original.
    ///
    /// Placeholder mismatches are errors because interpolation would leave
    /// `{{name}}` visible or drop a value. URL and tag differences are warnings.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig_placeholders = Self::extract_placeholders(original);
        let trans_placeholders = Self::extract_placeholders(translated);
        if orig_placeholders != trans_placeholders {
            report.errors.push(format!(
                "Placeholder mismatch: original has {:?}, translation has {:?}",
                orig_placeholders, trans_placeholders
            ));
        }

        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        let orig_tags = Self::count_html_tags(original);
        let trans_tags = Self::count_html_tags(translated);
        if orig_tags != trans_tags {
            report.warnings.push(format!(
                "HTML tag count mismatch: original has {}, translation has {}",
                orig_tags, trans_tags
            ));
        }

        report
    }

    /// Placeholder names (`{{name}}` → `name`), deduplicated and sorted
    pub fn extract_placeholders(text: &str) -> BTreeSet<String> {
        regex(&PLACEHOLDER_REGEX, r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}")
            .captures_iter(text)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn extract_urls(text: &str) -> Vec<String> {
        regex(&URL_REGEX, r#"https?://[^\s)\]"'<>]+"#)
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn count_html_tags(text: &str) -> usize {
        regex(&HTML_TAG_REGEX, r"</?[a-zA-Z][a-zA-Z0-9]*[^<>]*>")
            .find_iter(text)
            .count()
    }
}
