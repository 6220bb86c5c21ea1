//! Heuristic filename parser
//!
//! Turns a raw installer filename (plus optional parent folder name) into a
//! structured identity: software name, version, vendor guess, release year,
//! and portability flag. Pure string processing, no I/O.
//!
//! The noise/edition/vendor tables were distilled from a large corpus of
//! real installer filenames; extending them is cheap and safe.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Words stripped from filenames when extracting the software name.
const NOISE_WORDS: &[&str] = &[
    // Installer-related
    "setup", "installer", "install", "portable", "full", "final", "with",
    // Crack / activation related
    "crack", "keygen", "patch", "serial", "key", "keys", "cracked",
    "activation", "activator", "activated", "registered", "licensed",
    // Architecture
    "x64", "x86", "ia64", "x32", "win", "mac", "linux", "bits", "bit",
    // Edition types
    "multilingual", "retail", "oem", "vlsc", "vol", "trial",
    // Packaging
    "repack", "repacked", "incl", "pre", "extras", "addon", "addons",
    "custom", "embedded", "delta", "winpe",
    // Build markers (ltsc intentionally absent: it distinguishes Office SKUs)
    "build", "sp1", "sp2", "sp3", "r1", "r2",
    // Container formats
    "dvd", "cd", "iso", "img", "exe", "msi", "zip", "rar", "7z", "cab",
    // Release groups / sites
    "sadeempc", "downloadly", "tryroom", "koreacrack", "kpojiuk",
    "xetrin", "yaschir", "ssq", "sse", "rg", "tbe", "fosi", "xforce", "team",
    // Localized noise
    "한국어판", "설치법", "인증방법", "스크린샷", "포터블", "휴대용",
    // Misc
    "readme", "instructions", "screenshot", "preview", "info",
];

/// Edition words that stay part of the product name.
const EDITION_WORDS: &[&str] = &[
    "pro", "plus", "premium", "ultimate", "enterprise", "professional",
    "home", "business", "student", "standard", "deluxe", "complete",
    "technician", "server", "advanced", "workstation", "edition",
    "master", "suite", "studio", "creative", "cloud",
];

/// Known vendors recognized anywhere in the cleaned name.
const KNOWN_VENDORS: &[&str] = &[
    "adobe", "microsoft", "autodesk", "jetbrains", "google",
    "apple", "oracle", "vmware", "docker", "slack", "zoom",
    "spotify", "discord", "steam", "epic", "nvidia", "amd", "intel",
    "ds", "dassault", "solidworks", "corel", "ashampoo", "wondershare",
    "cyberlink", "nero", "pixologic", "maxon", "foundry", "siemens",
];

/// Version patterns in priority order: explicit `v` prefixes beat bare
/// dotted numbers, which beat year-shaped and service-pack tokens.
static VERSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)v(\d+\.\d+\.\d+\.\d+)",
        r"(?i)v(\d+\.\d+\.\d+)",
        r"(?i)v(\d+\.\d+)",
        r"(\d+\.\d+\.\d+\.\d+\.\d+)",
        r"(\d+\.\d+\.\d+\.\d+)",
        r"(\d+\.\d+\.\d+)",
        r"[\s_](\d+\.\d+)[\s_]",
        r"\b(365|360|2024|2023|2022|2021|2020|2019|2018|2017|2016)\b",
        r"\b(20\d{2})\b",
        r"(?i)\bSP(\d+)\b",
        r"(?i)\bR(\d+)\b",
        r"(?i)\bv(\d+)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static EXTENSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^.]+$").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());
static RELEASE_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bby\s+\w+").unwrap());
static BRACKETED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());
static ARCH_SEPARATED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[._\s](x64|x86|32bit|64bit)[._\s]").unwrap());
static ARCH_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\((x64|x86|32bit|64bit|win|portable)\)").unwrap());
static BUILD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bbuild[_\s]*\d+").unwrap());
static DOMAIN_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\w{2,3}($|\s)").unwrap());
static PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._\-\[\]()]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Portability markers, including localized equivalents.
static PORTABLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bportable\b",
        r"(?i)\bport\b",
        r"(?i)\bportableapps\b",
        r"(?i)\bgreen\b",
        r"(?i)\bnoinstall\b",
        r"(?i)\bstandalone\b",
        r"포터블",
        r"휴대용",
        r"무설치",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Multi-volume archive part suffixes, checked on the lowercased filename.
static SPLIT_ARCHIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\.part\d+\.rar$",
        r"\.part\d+$",
        r"\.z\d{2,3}$",
        r"\.r\d{2,3}$",
        r"\.\d{3}$",
        r"\.7z\.\d{3}$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Structured identity extracted from a filename.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFilename {
    pub software_name: String,
    pub version: Option<String>,
    pub vendor: Option<String>,
    pub year: Option<String>,
    pub is_portable: bool,
}

/// Parse a filename (or folder name) into a structured identity.
///
/// `parent_folder` is fallback context: when the filename alone reduces to
/// something too short or generic (`setup`, `installer`, ...), the parent
/// folder name is used as the software name instead.
pub fn parse(filename: &str, parent_folder: Option<&str>) -> ParsedFilename {
    let stem = EXTENSION_RE.replace(filename, "").to_string();

    // Version and year come out before noise removal mangles them
    let version = extract_version(&stem);
    let year = extract_year(&stem);

    // Release-group and bracketed noise
    let mut name = RELEASE_GROUP_RE.replace_all(&stem, "").to_string();
    name = BRACKETED_RE.replace_all(&name, "").to_string();

    // Architecture tokens: _x64_, .x86., (x64) ...
    name = ARCH_SEPARATED_RE.replace_all(&name, " ").to_string();
    name = ARCH_PAREN_RE.replace_all(&name, "").to_string();

    // Build numbers and trailing domain-like suffixes
    name = BUILD_NUMBER_RE.replace_all(&name, "").to_string();
    name = DOMAIN_SUFFIX_RE.replace_all(&name, " ").to_string();

    // Punctuation to spaces, collapse runs
    let cleaned = PUNCTUATION_RE.replace_all(&name, " ").to_string();
    let cleaned = WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string();

    let mut software_name = extract_software_name(&cleaned, version.as_deref(), year.as_deref());

    // Too short or itself a noise word: fall back to the parent folder
    if let Some(parent) = parent_folder.filter(|p| !p.is_empty()) {
        if software_name.chars().count() < 3 || is_noise_word(&software_name.to_lowercase()) {
            software_name = parent.to_string();
        }
    }

    let vendor = extract_vendor(&software_name);
    let is_portable = detect_portable(filename, parent_folder.unwrap_or(""));

    ParsedFilename {
        software_name: software_name.trim().to_string(),
        version,
        vendor,
        year,
        is_portable,
    }
}

/// True when the filename is one part of a multi-volume archive.
///
/// Split parts are never eligible for unattended registration.
pub fn is_split_archive(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    SPLIT_ARCHIVE_PATTERNS.iter().any(|p| p.is_match(&lower))
}

/// Portability detection over the filename and its parent folder name.
pub fn detect_portable(filename: &str, parent_folder: &str) -> bool {
    let haystack = format!("{} {}", filename, parent_folder).to_lowercase();
    PORTABLE_PATTERNS.iter().any(|p| p.is_match(&haystack))
}

fn is_noise_word(word: &str) -> bool {
    NOISE_WORDS.contains(&word)
}

fn is_edition_word(word: &str) -> bool {
    EDITION_WORDS.contains(&word)
}

/// First version-shaped token by pattern priority.
fn extract_version(text: &str) -> Option<String> {
    for pattern in VERSION_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            let mut ver = caps[1].to_string();
            // Overly long dotted versions keep only their first 3 segments
            if ver.matches('.').count() > 3 {
                ver = ver.split('.').take(3).collect::<Vec<_>>().join(".");
            }
            return Some(ver);
        }
    }
    None
}

/// First 4-digit token in 2000-2099.
fn extract_year(text: &str) -> Option<String> {
    YEAR_RE.captures(text).map(|c| c[1].to_string())
}

/// Strip version/year tokens and noise words, keep at most 6 words.
fn extract_software_name(text: &str, version: Option<&str>, year: Option<&str>) -> String {
    let mut result = text.to_string();

    if let Some(ver) = version {
        let escaped = regex::escape(ver);
        for pattern in [
            format!(r"(?i)\bv?{}\b", escaped),
            format!(r"(?i)\bSP{}\b", escaped),
            format!(r"(?i)\bR{}\b", escaped),
        ] {
            if let Ok(re) = Regex::new(&pattern) {
                result = re.replace_all(&result, "").to_string();
            }
        }
    }

    if let Some(year) = year {
        if let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(year))) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    let filtered: Vec<&str> = result
        .split_whitespace()
        .filter(|word| {
            let lower = word.to_lowercase();
            if is_edition_word(&lower) {
                return true;
            }
            !is_noise_word(&lower)
                && !word.chars().all(|c| c.is_ascii_digit())
                && word.chars().count() > 1
        })
        .take(6)
        .collect();

    if !filtered.is_empty() {
        return filtered.join(" ");
    }

    text.split_whitespace()
        .next()
        .unwrap_or("Unknown")
        .to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Vendor guess: known vendor anywhere in the name, else a capitalized
/// leading word.
fn extract_vendor(software_name: &str) -> Option<String> {
    let words: Vec<&str> = software_name.split_whitespace().collect();
    let first = words.first()?;

    let name_lower = software_name.to_lowercase();
    for vendor in KNOWN_VENDORS {
        if name_lower.contains(vendor) {
            // Prefer the word as written to keep original casing
            if let Some(word) = words.iter().find(|w| w.to_lowercase() == *vendor) {
                return Some(capitalize(word));
            }
            if *vendor == "ds" {
                return Some("Dassault Systemes".to_string());
            }
            return Some(capitalize(vendor));
        }
    }

    let first_lower = first.to_lowercase();
    if KNOWN_VENDORS.contains(&first_lower.as_str()) {
        if first_lower == "ds" {
            return Some("Dassault Systemes".to_string());
        }
        return Some(capitalize(first));
    }

    // Capitalized leading word of at least 2 characters
    if first.chars().count() >= 2 && first.chars().next().is_some_and(|c| c.is_uppercase()) {
        return Some((*first).to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_filename() {
        let parsed = parse("Adobe_Photoshop_CC_2023_v24.0.1_x64.exe", None);
        assert!(parsed.software_name.contains("Adobe Photoshop CC"));
        assert_eq!(parsed.version.as_deref(), Some("24.0.1"));
        assert_eq!(parsed.vendor.as_deref(), Some("Adobe"));
        assert_eq!(parsed.year.as_deref(), Some("2023"));
        assert!(!parsed.is_portable);
    }

    #[test]
    fn falls_back_to_parent_folder_for_noise_filename() {
        let parsed = parse("setup.exe", Some("MS Office 2021 LTSC"));
        assert_eq!(parsed.software_name, "MS Office 2021 LTSC");
    }

    #[test]
    fn v_prefix_beats_bare_numbers() {
        let parsed = parse("Total Commander 10 v10.51.zip", None);
        assert_eq!(parsed.version.as_deref(), Some("10.51"));
    }

    #[test]
    fn year_shaped_version() {
        let parsed = parse("Microsoft Office 2021.iso", None);
        assert_eq!(parsed.version.as_deref(), Some("2021"));
        assert_eq!(parsed.year.as_deref(), Some("2021"));
        assert_eq!(parsed.vendor.as_deref(), Some("Microsoft"));
    }

    #[test]
    fn office_365_special_version() {
        let parsed = parse("Office 365 Installer.exe", None);
        assert_eq!(parsed.version.as_deref(), Some("365"));
    }

    #[test]
    fn long_versions_truncate_to_three_segments() {
        let parsed = parse("Tool 1.2.3.4.5.zip", None);
        assert_eq!(parsed.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn strips_release_group_and_brackets() {
        let parsed = parse("CyberLink PowerDVD v22.0 by SadeemPC [latest].rar", None);
        assert!(!parsed.software_name.to_lowercase().contains("sadeempc"));
        assert!(!parsed.software_name.contains('['));
        assert_eq!(parsed.version.as_deref(), Some("22.0"));
    }

    #[test]
    fn keeps_edition_words() {
        let parsed = parse("VMware Workstation Pro v17.0.exe", None);
        assert!(parsed.software_name.contains("Pro"));
        assert_eq!(parsed.vendor.as_deref(), Some("Vmware"));
    }

    #[test]
    fn detects_portable_markers() {
        assert!(parse("Notepad++ Portable.zip", None).is_portable);
        assert!(parse("app.exe", Some("Everything Standalone")).is_portable);
        assert!(!parse("Notepad++.exe", None).is_portable);
    }

    #[test]
    fn split_archive_detection() {
        assert!(is_split_archive("Setup.part01.rar"));
        assert!(is_split_archive("Setup.z01"));
        assert!(is_split_archive("Setup.r00"));
        assert!(is_split_archive("Setup.7z.001"));
        assert!(is_split_archive("backup.001"));
        assert!(!is_split_archive("Setup.rar"));
        assert!(!is_split_archive("Setup.exe"));
    }

    #[test]
    fn vendor_guess_from_capitalized_first_word() {
        let parsed = parse("Blender 4.1.zip", None);
        assert_eq!(parsed.vendor.as_deref(), Some("Blender"));
    }

    #[test]
    fn no_vendor_for_lowercase_unknown_name() {
        let parsed = parse("tool v1.2.zip", None);
        assert_eq!(parsed.vendor, None);
    }
}
