// Configuration Management Module
// Handles storefront.toml loading, defaults, and validation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, Context};
use tracing::{info, warn};

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "STOREFRONT_API_BASE_URL";

/// Main storefront client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Root URL every relative API path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fixed per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub backend: CredentialBackend,

    /// File holding persisted credentials (file backend only)
    #[serde(default = "default_credentials_path")]
    pub path: PathBuf,

    /// Fixed name the bearer token is stored under
    #[serde(default = "default_credential_key")]
    pub key: String,
}

/// Where the bearer credential lives between runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Explicit tracing filter; `RUST_LOG` wins when set
    #[serde(default)]
    pub filter: Option<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_sort")]
    pub sort: String,
}

// Default value functions
fn default_base_url() -> String { "http://localhost:8080".to_string() }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_credentials_path() -> PathBuf { PathBuf::from(".storefront/credentials.json") }
fn default_credential_key() -> String { "token".to_string() }
fn default_page_size() -> u32 { 8 }
fn default_sort() -> String { "popularity".to_string() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            path: default_credentials_path(),
            key: default_credential_key(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sort: default_sort(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl StorefrontConfig {
    /// Load configuration from file or use defaults, then validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from file or use defaults, without validating
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let contents = std::fs::read_to_string(path)
                .context("Failed to read configuration file")?;

            Self::from_toml(&contents)?
        } else {
            warn!("Configuration file not found, using defaults");
            info!("Create storefront.toml to customize configuration");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration file")
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                info!(base_url = %base_url, "API base URL overridden from environment");
                self.api.base_url = base_url;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            anyhow::bail!("API base URL cannot be empty");
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!("API base URL must start with http:// or https://");
        }

        if self.api.timeout_ms == 0 {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        if self.credentials.key.trim().is_empty() {
            anyhow::bail!("Credential key cannot be empty");
        }

        if self.catalog.page_size == 0 {
            anyhow::bail!("Catalog page size must be at least 1");
        }

        Ok(())
    }
}
