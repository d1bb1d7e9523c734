//! Configuration management for the movement workflow

use crate::constants::{CONFIG_ENV_PREFIX, DEFAULT_SCHEMA, DEFAULT_TIMEOUT_SECS};
use crate::error::{MovementError, Result};
use crate::types::SessionContext;
use movement_types::{CompanyId, UserId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    pub data_service: DataServiceConfig,
    pub session: SessionConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Hosted relational data service (PostgREST-style endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataServiceConfig {
    #[serde(alias = "url")]     // Accept both 'base_url' and 'url'
    pub base_url: String,

    #[serde(alias = "token")]   // Accept both 'api_key' and 'token'
    pub api_key: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Tenant and user the console session runs as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub company_id: String,

    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_enabled: default_cache_enabled(),
        }
    }
}

// Default functions
fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_cache_enabled() -> bool {
    true
}

impl MovementConfig {
    /// Load configuration from a JSON file.
    ///
    /// `MOVEMENTS__<SECTION>__<KEY>` environment variables override file values,
    /// e.g. `MOVEMENTS__DATA_SERVICE__API_KEY`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MovementError::Config(format!("Failed to read config file: {}", e)))?;

        Self::load(&content, true)
    }

    /// Load configuration from a JSON string (no environment overrides)
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::load(json, false)
    }

    fn load(json: &str, with_env: bool) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json));

        if with_env {
            builder = builder.add_source(
                config::Environment::with_prefix(CONFIG_ENV_PREFIX).separator("__"),
            );
        }

        let settings = builder
            .build()
            .map_err(|e| MovementError::Config(format!("Failed to parse config: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| MovementError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_service.base_url.trim().is_empty() {
            return Err(MovementError::Config("Data service URL is required".to_string()));
        }

        if self.data_service.api_key.is_empty() {
            return Err(MovementError::Config("Data service API key is required".to_string()));
        }

        if self.session.company_id.trim().is_empty() {
            return Err(MovementError::Config("Session company_id is required".to_string()));
        }

        Ok(())
    }

    /// Session context passed explicitly into every repository call
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            company_id: CompanyId::new(self.session.company_id.clone()),
            user_id: self.session.user_id.clone().map(UserId::new),
        }
    }
}
