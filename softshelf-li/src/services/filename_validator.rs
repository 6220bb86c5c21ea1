//! Filename naming-convention validator
//!
//! Checks a filename against the library's naming rules and produces zero or
//! more violation descriptors, each with a suggested fix. All checks are
//! independent and may fire together on one filename; the first violation in
//! declaration order is the highest-priority one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Acronyms forced to uppercase by the title-case suggestion.
const ACRONYMS: &[&str] = &["cc", "ui", "ux", "api", "sdk", "ide"];

/// Characters allowed in a filename besides alphanumerics.
const ALLOWED_SPECIALS: &[char] = &['.', '-', '_', ' '];

/// Stem length above which a filename counts as too complex.
const MAX_STEM_LEN: usize = 100;

static VERSION_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[\s._]|^)(\d+(?:\.\d+)+)(?:\s|_|\.|-|$)").unwrap());
static V_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\s._]v\d+").unwrap());
static UNDERSCORE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Kinds of naming-convention violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    UnderscoreOveruse,
    BracketUsage,
    VersionFormat,
    LowercaseName,
    ComplexName,
    InvalidChars,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::UnderscoreOveruse => "underscore_overuse",
            ViolationKind::BracketUsage => "bracket_usage",
            ViolationKind::VersionFormat => "version_format",
            ViolationKind::LowercaseName => "lowercase_name",
            ViolationKind::ComplexName => "complex_name",
            ViolationKind::InvalidChars => "invalid_chars",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violation with its human-readable detail and suggested fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub details: String,
    pub suggestion: String,
}

/// Result of validating one filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
}

/// Validate a filename (extension included) against the naming rules.
pub fn validate(filename: &str) -> ValidationReport {
    let mut violations = Vec::new();

    let (base_name, extension) = match filename.rsplit_once('.') {
        Some((base, ext)) => (base.to_string(), format!(".{}", ext)),
        None => (filename.to_string(), String::new()),
    };

    // 1. Underscore overuse (3 or more)
    let underscore_count = base_name.matches('_').count();
    if underscore_count >= 3 {
        violations.push(Violation {
            kind: ViolationKind::UnderscoreOveruse,
            details: format!(
                "Filename uses {} underscores; use spaces instead.",
                underscore_count
            ),
            suggestion: format!("{}{}", suggest_underscore_fix(&base_name), extension),
        });
    }

    // 2. Brackets are not allowed
    if filename.contains('[') || filename.contains(']') {
        violations.push(Violation {
            kind: ViolationKind::BracketUsage,
            details: "Square brackets are not allowed; fold the content into the name or drop it."
                .to_string(),
            suggestion: filename
                .replace('[', "")
                .replace(']', "")
                .replace("  ", " ")
                .trim()
                .to_string(),
        });
    }

    // 3. Version-shaped token without a `v` marker
    let version_candidates: Vec<String> = VERSION_LIKE_RE
        .captures_iter(&base_name)
        .map(|c| c[1].to_string())
        .collect();
    let has_v_marker = V_MARKER_RE.is_match(&base_name);
    if !version_candidates.is_empty() && !has_v_marker {
        // Longest candidate is the most plausible full version number
        let version_num = version_candidates
            .iter()
            .max_by_key(|v| v.len())
            .cloned()
            .unwrap_or_default();
        violations.push(Violation {
            kind: ViolationKind::VersionFormat,
            details: format!("Version '{}' is not in v-prefixed form.", version_num),
            suggestion: format!(
                "{}{}",
                suggest_version_fix(&base_name, &version_num),
                extension
            ),
        });
    }

    // 4. All-lowercase product name (short names are exempt)
    if is_all_lowercase(&base_name) && base_name.chars().count() > 5 {
        violations.push(Violation {
            kind: ViolationKind::LowercaseName,
            details: "Filename is entirely lowercase; use the official product capitalization."
                .to_string(),
            suggestion: format!("{}{}", suggest_title_case(&base_name), extension),
        });
    }

    // 5. Overly long stem
    let stem_len = base_name.chars().count();
    if stem_len > MAX_STEM_LEN {
        violations.push(Violation {
            kind: ViolationKind::ComplexName,
            details: format!("Filename is too long ({} characters).", stem_len),
            suggestion: "Simplify to the 'Product Name.vVersion-Extra' form.".to_string(),
        });
    }

    // 6. Characters outside the allowed set
    let invalid_chars: BTreeSet<char> = base_name
        .chars()
        .filter(|c| !c.is_alphanumeric() && !ALLOWED_SPECIALS.contains(c))
        .collect();
    if !invalid_chars.is_empty() {
        let listed: Vec<String> = invalid_chars.iter().map(|c| c.to_string()).collect();
        violations.push(Violation {
            kind: ViolationKind::InvalidChars,
            details: format!("Disallowed special characters: {}", listed.join(", ")),
            suggestion: remove_invalid_chars(filename, &invalid_chars),
        });
    }

    ValidationReport {
        is_valid: violations.is_empty(),
        violations,
    }
}

/// Collapse runs of underscores into single spaces.
fn suggest_underscore_fix(base_name: &str) -> String {
    UNDERSCORE_RUN_RE.replace_all(base_name, " ").trim().to_string()
}

/// Insert a `v` before the version, replacing the most plausible separator.
///
/// `Total_Commander_10.51` becomes `Total_Commander v10.51`.
fn suggest_version_fix(base_name: &str, version_num: &str) -> String {
    let replacements = [
        (format!("_{}", version_num), format!(" v{}", version_num)),
        (format!(".{}", version_num), format!(" v{}", version_num)),
        (format!(" {}", version_num), format!(" v{}", version_num)),
    ];
    for (old, new) in &replacements {
        if base_name.contains(old.as_str()) {
            return base_name.replacen(old.as_str(), new, 1);
        }
    }
    base_name.to_string()
}

/// Title-case the stem, forcing known acronyms to uppercase.
fn suggest_title_case(base_name: &str) -> String {
    base_name
        .replace('_', " ")
        .replace('-', " - ")
        .split_whitespace()
        .map(|word| {
            if word == "-" || word == "." {
                word.to_string()
            } else if ACRONYMS.contains(&word) {
                word.to_uppercase()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn remove_invalid_chars(filename: &str, invalid: &BTreeSet<char>) -> String {
    filename
        .chars()
        .filter(|c| !invalid.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lowercase check: at least one alphabetic character and no uppercase ones.
fn is_all_lowercase(s: &str) -> bool {
    let mut has_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if c.is_uppercase() {
                return false;
            }
        }
    }
    has_alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(report: &ValidationReport) -> Vec<ViolationKind> {
        report.violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn clean_filename_passes() {
        let report = validate("Total Commander.v10.51-Final.zip");
        assert!(report.is_valid, "violations: {:?}", report.violations);
    }

    #[test]
    fn underscore_overuse_flagged_with_fix() {
        let report = validate("My_Tool_Name_Crack_Final.zip");
        assert!(!report.is_valid);
        assert!(kinds(&report).contains(&ViolationKind::UnderscoreOveruse));
        let v = &report.violations[0];
        assert_eq!(v.kind, ViolationKind::UnderscoreOveruse);
        assert_eq!(v.suggestion, "My Tool Name Crack Final.zip");
    }

    #[test]
    fn bracket_usage_flagged() {
        let report = validate("Tool [Latest].exe");
        assert!(kinds(&report).contains(&ViolationKind::BracketUsage));
        let v = report
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::BracketUsage)
            .unwrap();
        assert_eq!(v.suggestion, "Tool Latest.exe");
    }

    #[test]
    fn version_without_marker_flagged() {
        let report = validate("VMware Workstation Pro 16.0.0.exe");
        let v = report
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::VersionFormat)
            .expect("version_format violation");
        assert_eq!(v.suggestion, "VMware Workstation Pro v16.0.0.exe");
    }

    #[test]
    fn underscore_separated_version_fix() {
        let report = validate("Total_Commander_10.51.zip");
        let v = report
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::VersionFormat)
            .expect("version_format violation");
        assert_eq!(v.suggestion, "Total_Commander v10.51.zip");
    }

    #[test]
    fn v_marker_satisfies_version_rule() {
        let report = validate("Tool.v10.51.zip");
        assert!(!kinds(&report).contains(&ViolationKind::VersionFormat));
    }

    #[test]
    fn lowercase_name_flagged_with_title_case() {
        let report = validate("photoshop cc portable.zip");
        let v = report
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::LowercaseName)
            .expect("lowercase_name violation");
        assert_eq!(v.suggestion, "Photoshop CC Portable.zip");
    }

    #[test]
    fn short_lowercase_names_exempt() {
        let report = validate("tool.exe");
        assert!(!kinds(&report).contains(&ViolationKind::LowercaseName));
    }

    #[test]
    fn complex_name_flagged() {
        let long = "a".repeat(120);
        let report = validate(&format!("{}.zip", long));
        assert!(kinds(&report).contains(&ViolationKind::ComplexName));
    }

    #[test]
    fn invalid_chars_flagged_and_stripped() {
        let report = validate("Tool@Home!.exe");
        let v = report
            .violations
            .iter()
            .find(|v| v.kind == ViolationKind::InvalidChars)
            .expect("invalid_chars violation");
        assert_eq!(v.suggestion, "ToolHome.exe");
    }

    #[test]
    fn multiple_violations_fire_together() {
        let report = validate("my_bad_tool_name_2.5 [x].zip");
        let found = kinds(&report);
        assert!(found.contains(&ViolationKind::UnderscoreOveruse));
        assert!(found.contains(&ViolationKind::BracketUsage));
        assert!(found.contains(&ViolationKind::VersionFormat));
        assert!(found.contains(&ViolationKind::LowercaseName));
        assert!(found.contains(&ViolationKind::InvalidChars));
    }
}
