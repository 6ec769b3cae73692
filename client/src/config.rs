//! Configuration management for the Inventory Dashboard client
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with INVDASH__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main client configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Remote data backend
    pub gateway: GatewayConfig,

    /// Live update behaviour
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Base URL of the data backend, without the `/rest/v1` suffix
    pub url: String,

    /// Public API key, sent as `apikey` and as the bearer token
    pub api_key: String,

    /// Prefix of every base table relation
    pub table_prefix: String,

    /// Database schema selected through the profile headers
    pub schema: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Subscribe to change notifications after the initial load
    pub live_updates: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("INVDASH__ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("gateway.url", "http://localhost:54321")?
            .set_default("gateway.api_key", "")?
            .set_default("gateway.table_prefix", "inventory_")?
            .set_default("gateway.schema", "public")?
            .set_default("gateway.timeout_secs", 30)?
            .set_default("sync.live_updates", true)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INVDASH__ prefix)
            .add_source(
                Environment::with_prefix("INVDASH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            table_prefix: "inventory_".to_string(),
            schema: "public".to_string(),
            timeout_secs: 30,
        }
    }
}
