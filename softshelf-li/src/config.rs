//! Configuration for the Library Ingest service
//!
//! Two files, both TOML:
//! - the service config (`softshelf-li.toml`): scan paths, schedule
//!   interval, AI provider settings, auto-match switches;
//! - the exclusion rules (`scan-exclusions.toml`): folder names, file glob
//!   patterns, and explicit paths the scanner must skip.
//!
//! The AI API key resolves ENV → TOML, with the environment taking
//! precedence so deployments can avoid keys on disk.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use softshelf_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted for the AI provider API key.
pub const AI_API_KEY_ENV_VAR: &str = "SOFTSHELF_AI_API_KEY";

// ============================================================================
// Service configuration
// ============================================================================

/// AI provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettings {
    /// Provider name: "openai" or "gemini"
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier; empty selects the provider default
    #[serde(default)]
    pub model: String,
    /// API key; usually left empty in favor of the environment variable
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: String::new(),
            api_key: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_interval_minutes() -> u64 {
    1440
}

fn default_auto_accept_threshold() -> f64 {
    0.9
}

fn default_true() -> bool {
    true
}

/// Service configuration loaded from `softshelf-li.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Optional root folder override (also settable via CLI/env)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,
    /// Roots scanned by the scheduler
    #[serde(default)]
    pub scan_paths: Vec<PathBuf>,
    /// Minutes between scheduled scans
    #[serde(default = "default_interval_minutes")]
    pub scan_interval_minutes: u64,
    /// Whether the scheduler runs the auto-matcher after scanning
    #[serde(default = "default_true")]
    pub auto_match: bool,
    /// Confidence at or above which synthesized metadata is auto-accepted
    #[serde(default = "default_auto_accept_threshold")]
    pub auto_accept_threshold: f64,
    /// AI provider settings
    #[serde(default)]
    pub ai: AiSettings,
    /// Tracing filter override (e.g. "softshelf_li=debug")
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            scan_paths: Vec::new(),
            scan_interval_minutes: default_interval_minutes(),
            auto_match: true,
            auto_accept_threshold: default_auto_accept_threshold(),
            ai: AiSettings::default(),
            log_filter: None,
        }
    }
}

impl ServiceConfig {
    /// Load from a TOML file; missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No service config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Resolve the AI API key: environment variable first, then TOML.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(AI_API_KEY_ENV_VAR) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        self.ai
            .api_key
            .as_ref()
            .filter(|k| !k.trim().is_empty())
            .cloned()
    }
}

// ============================================================================
// Exclusion rules
// ============================================================================

/// On-disk form of the exclusion rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExclusionFile {
    #[serde(default)]
    folders: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    paths: Vec<PathBuf>,
}

impl Default for ExclusionFile {
    fn default() -> Self {
        Self {
            folders: [".DAV", ".git", ".node_modules", "_MACOSX", "#recycle", "@eaDir"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            patterns: [
                "*.txt",
                "*.log",
                "thumbs.db",
                "desktop.ini",
                "*.nfo",
                "*.sfv",
                "*.sha1",
                "*.md5",
                "*.md4",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            paths: Vec::new(),
        }
    }
}

/// Configured sets of excluded folder names, glob file patterns, and
/// explicit path prefixes. All name matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    folders: Vec<String>,
    patterns: Vec<Pattern>,
    paths: Vec<PathBuf>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::from_file(ExclusionFile::default())
    }
}

impl ExclusionRules {
    fn from_file(file: ExclusionFile) -> Self {
        let folders = file.folders.iter().map(|f| f.to_lowercase()).collect();
        let patterns = file
            .patterns
            .iter()
            .filter_map(|p| match Pattern::new(&p.to_lowercase()) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Ignoring invalid exclusion pattern");
                    None
                }
            })
            .collect();
        Self {
            folders,
            patterns,
            paths: file.paths,
        }
    }

    /// Build rules directly from string lists (used by tests and callers
    /// that manage their own persistence).
    pub fn new(folders: Vec<String>, patterns: Vec<String>, paths: Vec<PathBuf>) -> Self {
        Self::from_file(ExclusionFile {
            folders,
            patterns,
            paths,
        })
    }

    /// Load rules from a TOML file, writing the defaults when the file does
    /// not exist yet so operators have something to edit.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let defaults = ExclusionFile::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&defaults)
                .map_err(|e| Error::Config(format!("Serialize exclusions failed: {}", e)))?;
            // Best-effort: an unwritable config dir should not block scanning
            if let Err(e) = std::fs::write(path, content) {
                warn!(path = %path.display(), error = %e, "Could not write default exclusions");
            }
            return Ok(Self::from_file(defaults));
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::from_file(ExclusionFile::default()));
        }
        let file: ExclusionFile = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        Ok(Self::from_file(file))
    }

    /// Whether a directory name is excluded from scanning.
    pub fn is_excluded_folder(&self, folder_name: &str) -> bool {
        let name = folder_name.to_lowercase();
        self.folders.iter().any(|f| *f == name)
    }

    /// Whether a file name is excluded, by exact name or glob pattern.
    pub fn is_excluded_file(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        if self.folders.iter().any(|f| *f == name) {
            return true;
        }
        self.patterns.iter().any(|p| p.matches(&name))
    }

    /// Whether a path falls under one of the explicitly excluded prefixes.
    pub fn is_excluded_path(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| path.starts_with(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_skip_system_noise() {
        let rules = ExclusionRules::default();
        assert!(rules.is_excluded_folder(".git"));
        assert!(rules.is_excluded_folder(".GIT"));
        assert!(!rules.is_excluded_folder("Adobe"));
        assert!(rules.is_excluded_file("readme.txt"));
        assert!(rules.is_excluded_file("Thumbs.db"));
        assert!(rules.is_excluded_file("checksums.MD5"));
        assert!(!rules.is_excluded_file("Setup.exe"));
    }

    #[test]
    fn path_prefix_exclusion() {
        let rules = ExclusionRules::new(
            vec![],
            vec![],
            vec![PathBuf::from("/library/quarantine")],
        );
        assert!(rules.is_excluded_path(Path::new("/library/quarantine/tool/Setup.exe")));
        assert!(!rules.is_excluded_path(Path::new("/library/clean/Setup.exe")));
    }

    #[test]
    fn load_creates_default_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("scan-exclusions.toml");
        let rules = ExclusionRules::load(&path).unwrap();
        assert!(path.exists());
        assert!(rules.is_excluded_folder("#recycle"));
    }

    #[test]
    fn api_key_env_overrides_toml() {
        let config = ServiceConfig {
            ai: AiSettings {
                api_key: Some("from-toml".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        // No env var set in tests: TOML value wins
        std::env::remove_var(AI_API_KEY_ENV_VAR);
        assert_eq!(config.resolve_api_key().as_deref(), Some("from-toml"));
    }
}
