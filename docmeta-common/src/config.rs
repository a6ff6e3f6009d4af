//! Configuration loading and root folder resolution
//!
//! The root folder holds `docmeta.db`. It is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`DOCMETA_ROOT_FOLDER`, then `DOCMETA_ROOT`)
//! 3. TOML config file (`<config dir>/docmeta/<module>.toml`, then `config.toml`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal; resolution falls
//! through to the next tier with a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "docmeta.db";

/// Primary environment variable for the root folder
pub const ROOT_FOLDER_ENV: &str = "DOCMETA_ROOT_FOLDER";

/// Alternative (shorter) environment variable for the root folder
pub const ROOT_ENV: &str = "DOCMETA_ROOT";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset ("trace".."error")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Contents of a docmeta TOML config file
///
/// ```toml
/// root_folder = "/srv/docmeta"
/// data_dir = "/workspace/data/raw"
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding docmeta.db
    pub root_folder: Option<PathBuf>,
    /// Default directory scanned for parquet files
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load the config file for a module; `Ok(None)` when none exists
    ///
    /// Binaries call this before logging is installed and report the error
    /// themselves once it is.
    pub fn try_load_for_module(module_name: &str) -> Result<Option<Self>> {
        match config_file_path(module_name) {
            Some(path) => Self::load(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Load the config file for a module, if one exists
    ///
    /// Parse errors are logged and treated as "no config".
    pub fn load_for_module(module_name: &str) -> Option<Self> {
        match Self::try_load_for_module(module_name) {
            Ok(config) => {
                if config.is_some() {
                    debug!("Loaded config file for {}", module_name);
                }
                config
            }
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                None
            }
        }
    }
}

/// Platform defaults used when nothing else is configured
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "windows") {
            // %LOCALAPPDATA%\docmeta
            dirs::data_local_dir()
                .map(|d| d.join("docmeta"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\docmeta"))
        } else if cfg!(target_os = "macos") {
            // ~/Library/Application Support/docmeta
            dirs::data_dir()
                .map(|d| d.join("docmeta"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/docmeta"))
        } else {
            // ~/.local/share/docmeta
            dirs::data_local_dir()
                .map(|d| d.join("docmeta"))
                .unwrap_or_else(|| PathBuf::from("./docmeta_data"))
        };

        Self {
            root_folder,
            data_dir: PathBuf::from("data/raw"),
            log_level: default_log_level(),
        }
    }
}

/// Locate the config file for a module
///
/// Prefers `<config dir>/docmeta/<module>.toml`, falls back to the shared
/// `<config dir>/docmeta/config.toml`. Returns None when neither exists.
fn config_file_path(module_name: &str) -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("docmeta");
    [dir.join(format!("{}.toml", module_name)), dir.join("config.toml")]
        .into_iter()
        .find(|p| p.is_file())
}

/// Root folder resolution (CLI > env > TOML > compiled default)
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            cli_arg: None,
        }
    }

    /// Set the command-line override (tier 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            debug!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        // Priority 2: Environment variables
        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    debug!("Root folder from {}: {}", var, value);
                    return PathBuf::from(value);
                }
            }
        }

        // Priority 3: TOML config file
        if let Some(root) = TomlConfig::load_for_module(&self.module_name)
            .and_then(|c| c.root_folder)
        {
            debug!("Root folder from config file: {}", root.display());
            return root;
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the resolved root folder for use
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder (and parents) if missing; idempotent
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            debug!("Created root folder {}", self.root_folder.display());
        }
        if !self.root_folder.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                self.root_folder.display()
            )));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let resolver = RootFolderResolver::new("unit-test")
            .with_cli_arg(Some(PathBuf::from("/tmp/docmeta-cli")));
        assert_eq!(resolver.resolve(), PathBuf::from("/tmp/docmeta-cli"));
    }

    #[test]
    fn test_logging_defaults_to_info() {
        let config: TomlConfig = toml::from_str("root_folder = \"/srv/docmeta\"").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.data_dir, None);
    }
}
