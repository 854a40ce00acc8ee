//! Configuration file support for MediFlex.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/mediflex/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Recommendation service connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Path of the login page used to build redirect targets
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Page path carried in the `redirect=` parameter of login redirects
    #[serde(default = "default_redirect_from")]
    pub redirect_from: String,

    /// Cookie header sent with every request, for an authenticated web session
    #[serde(default)]
    pub session_cookie: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            login_path: default_login_path(),
            redirect_from: default_redirect_from(),
            session_cookie: None,
        }
    }
}

/// Report export configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Directory for exported reports; falls back to the current directory
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("mediflex")
}

fn default_base_url() -> String {
    "http://localhost:5000".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_login_path() -> String {
    "/auth/login".into()
}

fn default_redirect_from() -> String {
    "/".into()
}

impl Config {
    /// Load configuration from `config_path`, falling back to defaults when
    /// the file does not exist
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("mediflex").join("config.toml")
    }

    /// Save the configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject settings the service client cannot work with
    pub fn validate(&self) -> Result<()> {
        let url = self.service.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "service.base_url must be an http(s) URL, got {:?}",
                self.service.base_url
            )));
        }
        if self.service.timeout_secs == 0 {
            return Err(Error::Config("service.timeout_secs must be positive".into()));
        }
        if !self.service.login_path.starts_with('/') {
            return Err(Error::Config(format!(
                "service.login_path must start with '/', got {:?}",
                self.service.login_path
            )));
        }
        Ok(())
    }

    /// Location of the credential database
    pub fn credentials_path(&self) -> PathBuf {
        self.data.data_dir.join("mediflex.db")
    }

    /// Location of the persisted session flags
    pub fn session_path(&self) -> PathBuf {
        self.data.data_dir.join("session.json")
    }

    /// Location of persisted UI preferences
    pub fn preferences_path(&self) -> PathBuf {
        self.data.data_dir.join("preferences.json")
    }

    /// Location of the consultation history log
    pub fn history_path(&self) -> PathBuf {
        self.data.data_dir.join("history").join("consultations.jsonl")
    }
}
