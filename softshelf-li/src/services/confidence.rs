//! Confidence scoring for synthesized metadata
//!
//! Deterministic 0.0-1.0 score of how trustworthy a candidate metadata
//! payload is for a parsed filename identity, used to gate unattended
//! auto-acceptance against human review.
//!
//! Weighted terms, each capped at its weight:
//! - title similarity to the parsed software name: 30%
//! - vendor present and not a placeholder: 15%
//! - description length in a healthy band: 15%
//! - category in the accepted set: 15%
//! - well-formed icon URL: 10%
//! - well-formed official website: 15%

use crate::models::metadata::{is_valid_category, SoftwareMetadata};
use crate::services::filename_parser::ParsedFilename;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Default score at or above which metadata is auto-accepted.
pub const AUTO_ACCEPT_THRESHOLD: f64 = 0.9;

static VERSION_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(v?\d+\.?\d*\.?\d*)\b").unwrap());
static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

/// Confidence bucket for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

/// Bucket a score: >= 0.9 high, >= 0.7 medium, else low.
pub fn level(score: f64) -> ConfidenceLevel {
    if score >= 0.9 {
        ConfidenceLevel::High
    } else if score >= 0.7 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Whether a score clears the auto-registration threshold.
pub fn should_auto_register(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Score candidate metadata against a parsed filename identity.
pub fn score(metadata: &SoftwareMetadata, parsed: &ParsedFilename) -> f64 {
    let mut score = 0.0;

    // 1. Title similarity (0.30)
    score += title_similarity(&metadata.title, &parsed.software_name) * 0.30;

    // 2. Vendor present and not a placeholder (0.15)
    let vendor = metadata.vendor.trim().to_lowercase();
    if !vendor.is_empty() && vendor != "unknown" && vendor != "n/a" {
        score += 0.15;
    }

    // 3. Description length band (0.15 full, 0.08 partial)
    let desc_len = metadata.description.chars().count();
    if (100..=500).contains(&desc_len) {
        score += 0.15;
    } else if (50..100).contains(&desc_len) || (501..=1000).contains(&desc_len) {
        score += 0.08;
    }

    // 4. Category validity (0.15)
    if is_valid_category(&metadata.category) {
        score += 0.15;
    }

    // 5. Icon URL present and well-formed (0.10)
    if metadata.icon_url.starts_with("http") {
        score += 0.10;
    }

    // 6. Official website present and well-formed (0.15)
    if metadata.official_website.starts_with("http") {
        score += 0.15;
    }

    score.clamp(0.0, 1.0)
}

/// Similarity between a synthesized title and the parsed software name.
///
/// Sequence similarity blended 70/30 with a word-overlap bonus so that a
/// title containing all parsed words scores well even when extra words
/// stretch the edit distance.
pub fn title_similarity(title: &str, parsed_name: &str) -> f64 {
    if title.is_empty() || parsed_name.is_empty() {
        return 0.0;
    }

    let title_normalized = normalize_whitespace(&title.to_lowercase());
    let parsed_normalized = normalize_whitespace(&parsed_name.to_lowercase());

    let mut similarity = strsim::normalized_levenshtein(&title_normalized, &parsed_normalized);

    let parsed_words: HashSet<&str> = parsed_normalized.split_whitespace().collect();
    let title_words: HashSet<&str> = title_normalized.split_whitespace().collect();

    if !parsed_words.is_empty() && !title_words.is_empty() {
        let overlap =
            parsed_words.intersection(&title_words).count() as f64 / parsed_words.len() as f64;
        similarity = similarity * 0.7 + overlap * 0.3;
    }

    similarity
}

/// Normalize a software name into a metadata cache key: lowercase, version
/// and year-like tokens removed, non-alphanumerics stripped.
pub fn normalize_software_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let without_versions = VERSION_TOKEN_RE.replace_all(&lowered, "");
    let alnum_only = NON_ALNUM_RE.replace_all(&without_versions, " ");
    normalize_whitespace(&alnum_only)
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str) -> ParsedFilename {
        ParsedFilename {
            software_name: name.to_string(),
            ..Default::default()
        }
    }

    fn full_metadata() -> SoftwareMetadata {
        SoftwareMetadata {
            title: "Adobe Photoshop CC".to_string(),
            description: "a".repeat(200),
            vendor: "Adobe".to_string(),
            category: "Graphics".to_string(),
            icon_url: "https://example.com/icon.png".to_string(),
            official_website: "https://www.adobe.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn complete_metadata_clears_auto_accept() {
        let s = score(&full_metadata(), &parsed("Adobe Photoshop CC"));
        assert!(s >= 0.9, "score was {}", s);
        assert_eq!(level(s), ConfidenceLevel::High);
        assert!(should_auto_register(s, AUTO_ACCEPT_THRESHOLD));
    }

    #[test]
    fn sparse_metadata_routes_to_review() {
        let mut meta = full_metadata();
        meta.vendor = String::new();
        meta.icon_url = String::new();
        meta.official_website = String::new();
        let s = score(&meta, &parsed("Adobe Photoshop CC"));
        assert!(s < 0.7, "score was {}", s);
        assert_eq!(level(s), ConfidenceLevel::Low);
        assert!(!should_auto_register(s, AUTO_ACCEPT_THRESHOLD));
    }

    #[test]
    fn score_stays_in_bounds() {
        let empty = SoftwareMetadata::default();
        let s = score(&empty, &parsed(""));
        assert!((0.0..=1.0).contains(&s));

        let s = score(&full_metadata(), &parsed("Adobe Photoshop CC"));
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn score_is_monotone_in_single_factors() {
        let mut meta = SoftwareMetadata {
            title: "Adobe Photoshop CC".to_string(),
            ..Default::default()
        };
        let p = parsed("Adobe Photoshop CC");
        let base = score(&meta, &p);

        meta.vendor = "Adobe".to_string();
        let with_vendor = score(&meta, &p);
        assert!(with_vendor >= base);

        meta.icon_url = "https://example.com/icon.png".to_string();
        let with_icon = score(&meta, &p);
        assert!(with_icon >= with_vendor);

        meta.official_website = "https://www.adobe.com".to_string();
        let with_site = score(&meta, &p);
        assert!(with_site >= with_icon);
    }

    #[test]
    fn placeholder_vendor_earns_nothing() {
        let mut meta = full_metadata();
        let p = parsed("Adobe Photoshop CC");
        let with_vendor = score(&meta, &p);
        meta.vendor = "Unknown".to_string();
        assert!(score(&meta, &p) < with_vendor);
    }

    #[test]
    fn identical_titles_are_fully_similar() {
        let s = title_similarity("Adobe Photoshop", "Adobe Photoshop");
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn word_overlap_lifts_similarity() {
        let with_extra = title_similarity("Adobe Photoshop CC 2023 Edition", "Adobe Photoshop");
        assert!(with_extra > 0.5, "similarity was {}", with_extra);
    }

    #[test]
    fn normalization_strips_versions_and_punctuation() {
        assert_eq!(
            normalize_software_name("Adobe Photoshop CC 2023 v24.0"),
            "adobe photoshop cc"
        );
        assert_eq!(normalize_software_name("7-Zip v23.01"), "zip");
        assert_eq!(normalize_software_name("Notepad++"), "notepad");
    }

    #[test]
    fn description_band_scoring() {
        let p = parsed("Tool");
        let mut meta = SoftwareMetadata {
            title: "Tool".to_string(),
            ..Default::default()
        };

        meta.description = "x".repeat(300);
        let healthy = score(&meta, &p);
        meta.description = "x".repeat(60);
        let short = score(&meta, &p);
        meta.description = "x".repeat(10);
        let tiny = score(&meta, &p);

        assert!(healthy > short);
        assert!(short > tiny);
    }
}
