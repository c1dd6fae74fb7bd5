//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `FIVEWHY_ROOT_FOLDER` environment variable
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or malformed TOML file never stops startup: a warning is logged
//! and compiled defaults are used instead.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "FIVEWHY_ROOT_FOLDER";

/// Environment variable pointing at an explicit TOML config file
pub const CONFIG_FILE_ENV: &str = "FIVEWHY_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "fivewhy.db";

/// Default artifact file name inside the root folder
pub const DEFAULT_MODEL_FILE: &str = "model_artifact.json";

/// Default HTTP bind address for the API service
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8000";

/// Default origin allowed by CORS (the dashboard dev server)
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Confidence below which a prediction is flagged for human review
pub const DEFAULT_REVIEW_THRESHOLD: f64 = 0.3;

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing filter directive (e.g. "info", "fivewhy_ml=debug")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `fivewhy.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub review_threshold: Option<f64>,
    pub model_file: Option<String>,
    pub cors_origin: Option<String>,
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the config file, falling back to defaults on any problem
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config file {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} - continuing with compiled defaults", e);
                Self::default()
            }
        }
    }

    /// Config file location: `FIVEWHY_CONFIG`, else `<config_dir>/fivewhy/fivewhy.toml`
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("fivewhy").join("fivewhy.toml"))
    }
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
    pub model_file: String,
    pub cors_origin: String,
    pub review_threshold: f64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("fivewhy"))
            .unwrap_or_else(|| PathBuf::from("./fivewhy_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
        }
    }
}

/// Resolves the root folder following the priority order above
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml: TomlConfig,
}

impl RootFolderResolver {
    /// Create a resolver, reading the TOML config from its default location
    pub fn new(module_name: &str) -> Self {
        let toml = TomlConfig::load_or_default(TomlConfig::default_path().as_deref());
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml,
        }
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_toml(mut self, toml: TomlConfig) -> Self {
        self.toml = toml;
        self
    }

    pub fn toml(&self) -> &TomlConfig {
        &self.toml
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("{}: root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("{}: root folder from {}: {}", self.module_name, ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml.root_folder {
            info!("{}: root folder from config file: {}", self.module_name, path.display());
            return path.clone();
        }

        let path = CompiledDefaults::for_current_platform().root_folder;
        info!("{}: using default root folder: {}", self.module_name, path.display());
        path
    }
}

/// Creates the root folder and derives file locations inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn model_path(&self, file_name: &str) -> PathBuf {
        self.root_folder.join(file_name)
    }
}

/// Fully resolved settings shared by both binaries
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    pub model_path: PathBuf,
    pub bind_address: String,
    pub cors_origin: String,
    pub review_threshold: f64,
    pub log_level: String,
}

impl ServiceConfig {
    /// Combine a resolved root folder with TOML values and compiled defaults
    pub fn from_sources(root_folder: PathBuf, toml: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();
        let initializer = RootFolderInitializer::new(root_folder.clone());

        let review_threshold = toml.review_threshold.unwrap_or(defaults.review_threshold);
        if !(0.0..=1.0).contains(&review_threshold) {
            return Err(Error::Config(format!(
                "review_threshold must be within [0, 1], got {}",
                review_threshold
            )));
        }

        let model_file = toml.model_file.clone().unwrap_or(defaults.model_file);

        Ok(Self {
            database_path: initializer.database_path(),
            model_path: initializer.model_path(&model_file),
            root_folder,
            bind_address: toml.bind_address.clone().unwrap_or(defaults.bind_address),
            cors_origin: toml.cors_origin.clone().unwrap_or(defaults.cors_origin),
            review_threshold,
            log_level: toml.logging.level.clone(),
        })
    }
}
