//! Catalog metadata model
//!
//! One explicit struct carries everything the pipeline knows about a piece
//! of software, whether it came from the AI synthesizer, the metadata cache,
//! a human reviewer, or the heuristic filename parser. Downstream consumers
//! never probe dynamic maps for key presence.

use serde::{Deserialize, Serialize};

/// Categories the catalog accepts. Anything else scores zero in the
/// confidence calculation and is surfaced for review.
pub const VALID_CATEGORIES: &[&str] = &[
    "Graphics",
    "Office",
    "Development",
    "Utility",
    "Media",
    "OS",
    "Security",
    "Network",
    "Mac",
    "Mobile",
    "Patch",
    "Driver",
    "Source",
    "Backup",
    "Business",
    "Engineering",
    "Theme",
    "Hardware",
    "Font",
];

/// Maximum number of patch links stored per product.
pub const MAX_PATCH_LINKS: usize = 5;

/// Check whether a category string is one of the accepted catalog categories.
pub fn is_valid_category(category: &str) -> bool {
    VALID_CATEGORIES.contains(&category)
}

/// System requirement details, as synthesized or entered by a reviewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemRequirements {
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub ram: String,
    #[serde(default)]
    pub disk_space: String,
    #[serde(default)]
    pub gpu: String,
    #[serde(default)]
    pub additional: String,
}

/// Installation details for a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationInfo {
    #[serde(default)]
    pub installer_type: String,
    #[serde(default)]
    pub file_size: String,
    #[serde(default)]
    pub internet_required: String,
}

/// Structured candidate metadata for one product.
///
/// Required catalog fields are plain strings (empty when unknown, which the
/// confidence scorer penalizes); extended fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftwareMetadata {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub official_website: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub license_type: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub detailed_description: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub system_requirements: Option<SystemRequirements>,
    #[serde(default)]
    pub supported_formats: Option<Vec<String>>,
    #[serde(default)]
    pub installation_info: Option<InstallationInfo>,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub patch_links: Option<Vec<String>>,
}

impl SoftwareMetadata {
    /// Clamp list-valued fields to their storage limits.
    pub fn clamp_limits(&mut self) {
        if let Some(links) = &mut self.patch_links {
            links.truncate(MAX_PATCH_LINKS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_validation() {
        assert!(is_valid_category("Utility"));
        assert!(is_valid_category("Graphics"));
        assert!(!is_valid_category("Games"));
        assert!(!is_valid_category(""));
    }

    #[test]
    fn patch_links_are_capped() {
        let mut meta = SoftwareMetadata {
            patch_links: Some((0..8).map(|i| format!("https://example.com/{}", i)).collect()),
            ..Default::default()
        };
        meta.clamp_limits();
        assert_eq!(meta.patch_links.unwrap().len(), MAX_PATCH_LINKS);
    }

    #[test]
    fn deserializes_partial_json() {
        let meta: SoftwareMetadata =
            serde_json::from_str(r#"{"title": "7-Zip", "category": "Utility"}"#).unwrap();
        assert_eq!(meta.title, "7-Zip");
        assert_eq!(meta.category, "Utility");
        assert!(meta.description.is_empty());
        assert!(meta.features.is_none());
    }
}
