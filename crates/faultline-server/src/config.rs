//! Server configuration

use faultline_core::ServiceRef;
use faultline_sdk::{GovernanceConfig, RepositoryConfig};
use serde::{Deserialize, Serialize};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration
///
/// Every field has a default, so an absent `config/server` file and an
/// empty environment still yield a runnable in-memory server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port (HTTP)
    pub port: u16,

    /// Log level applied to the faultline crates when `RUST_LOG` is unset
    pub log_level: String,

    /// Human-readable lines or one JSON object per event
    pub log_format: LogFormat,

    /// Storage backend and read cache
    pub repository: RepositoryConfig,

    /// Lock timeout and batch limits
    pub governance: GovernanceConfig,

    /// Services registered in the directory at startup
    pub services: Vec<ServiceRef>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            repository: RepositoryConfig::default(),
            governance: GovernanceConfig::default(),
            services: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `config/server.*` and `FAULTLINE_*` variables
    ///
    /// Nested keys use a double underscore, e.g.
    /// `FAULTLINE_GOVERNANCE__MAX_BATCH_SIZE=50`.
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/server").required(false))
            .add_source(
                config::Environment::with_prefix("FAULTLINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to read config: {}", e))?;

        config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Default `EnvFilter` directives derived from `log_level`
    pub fn log_filter(&self) -> String {
        format!(
            "faultline_server={0},faultline_sdk={0},faultline_repository={0},tower_http=debug",
            self.log_level
        )
    }
}
