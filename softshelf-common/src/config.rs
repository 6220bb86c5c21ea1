//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `SOFTSHELF_ROOT` environment variable
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable consulted for the root folder.
pub const ROOT_ENV_VAR: &str = "SOFTSHELF_ROOT";

/// Resolve the root folder for a SoftShelf service.
///
/// `cli_arg` takes precedence over the environment, which takes precedence
/// over the service TOML config, which takes precedence over the platform
/// default data directory.
pub fn resolve_root_folder(cli_arg: Option<&str>, service: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(config_path) = config_file_path(&format!("{}.toml", service)) {
        if let Ok(content) = std::fs::read_to_string(&config_path) {
            if let Ok(value) = toml::from_str::<toml::Value>(&content) {
                if let Some(root) = value.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Path of a SoftShelf config file under the platform config directory,
/// e.g. `~/.config/softshelf/<file_name>` on Linux.
///
/// Returns `None` when the platform config directory cannot be determined.
pub fn config_file_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("softshelf").join(file_name))
}

/// Platform default root folder (`~/.local/share/softshelf` on Linux).
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("softshelf"))
        .unwrap_or_else(|| PathBuf::from("./softshelf_data"))
}

/// Resolved root folder with directory and database helpers.
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the root folder directory if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            if !self.path.is_dir() {
                return Err(Error::Config(format!(
                    "Root folder path is not a directory: {}",
                    self.path.display()
                )));
            }
            return Ok(());
        }
        std::fs::create_dir_all(&self.path)?;
        tracing::info!(path = %self.path.display(), "Created root folder");
        Ok(())
    }

    /// Path of the shared SQLite database inside the root folder.
    pub fn database_path(&self) -> PathBuf {
        self.path.join("softshelf.db")
    }
}
