//! Bootstrap configuration and root folder resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (handled by the binary)
//! 2. Environment variables (`ROSTER_ROOT_FOLDER`, `ROSTER_CONFIG`, `ROSTER_JWT_SECRET`)
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! A missing config file is not an error: the service logs a warning and
//! starts with defaults.

use crate::plans::PlanTable;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "ROSTER_ROOT_FOLDER";
/// Environment variable naming the TOML config file
pub const ENV_CONFIG: &str = "ROSTER_CONFIG";
/// Environment variable supplying the token signing secret
pub const ENV_TOKEN_SECRET: &str = "ROSTER_JWT_SECRET";

/// Bootstrap configuration loaded from TOML
///
/// These settings cannot change while the service runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database and uploaded assets
    pub root_folder: Option<PathBuf>,

    /// HTTP bind host
    pub host: String,

    /// HTTP server port
    pub port: u16,

    /// Database file name inside the root folder
    pub database_file: String,

    /// Largest accepted request body for spreadsheet uploads
    pub max_upload_bytes: usize,

    pub logging: LoggingConfig,

    pub auth: AuthConfig,

    /// Subscription plans offered at signup
    pub plans: PlanTable,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            host: "127.0.0.1".to_string(),
            port: 5740,
            database_file: "roster.db".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            plans: PlanTable::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret; generated and persisted in the settings table when absent
    pub token_secret: Option<String>,
    /// Token lifetime in seconds
    pub token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load the config file named by `explicit`, `ROSTER_CONFIG`, or the
    /// platform default location, falling back to defaults when none exists
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(ENV_CONFIG) {
            return Self::load(Path::new(&path));
        }

        match default_config_path() {
            Some(path) => {
                info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.database_file.trim().is_empty() {
            return Err(Error::Config("database_file must not be empty".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(Error::Config("auth.token_ttl_secs must be positive".to_string()));
        }
        if let Some(secret) = &self.auth.token_secret {
            if secret.trim().is_empty() {
                return Err(Error::Config("auth.token_secret must not be blank".to_string()));
            }
        }
        self.plans.validate()
    }

    /// Token secret from the environment, then from the config file
    pub fn token_secret(&self) -> Option<String> {
        std::env::var(ENV_TOKEN_SECRET)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.auth.token_secret.clone())
    }
}

/// Root folder resolution: CLI argument, environment, TOML, OS default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// First existing config file in the platform search path
fn default_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("roster").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/roster/config.toml"));
    }
    candidates.into_iter().find(|path| path.exists())
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("roster"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/roster"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("roster"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/roster"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("roster"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\roster"))
    } else {
        PathBuf::from("./roster_data")
    }
}

/// Layout of the resolved root folder
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

    /// Create the root folder and its asset directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [self.path.clone(), self.uploads_dir(), self.staging_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn database_path(&self, database_file: &str) -> PathBuf {
        self.path.join(database_file)
    }

    /// Directory holding student images, served at `/uploads`
    pub fn uploads_dir(&self) -> PathBuf {
        self.path.join("uploads")
    }

    /// Directory for transient spreadsheet uploads
    pub fn staging_dir(&self) -> PathBuf {
        self.path.join("staging")
    }
}
