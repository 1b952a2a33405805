use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ConfigError;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Prefix the workload routes are mounted under
    pub api_prefix: String,

    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,

    /// Requests slower than this are logged as warnings
    pub slow_request_threshold_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_prefix: "/api".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
            slow_request_threshold_ms: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Whether to log in JSON format
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Largest Fibonacci index whose value fits in a `u64`
pub const MAX_FIBONACCI_N: u32 = 93;

/// Upper bounds applied to caller-supplied workload sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadLimits {
    /// Deepest Fibonacci index computed
    pub max_fibonacci_n: u32,

    /// Most records allocated by the memory workload
    pub max_array_size: usize,

    /// Longest I/O delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for WorkloadLimits {
    fn default() -> Self {
        Self {
            max_fibonacci_n: 45,
            max_array_size: 10_000_000,
            max_delay_ms: 10_000,
        }
    }
}

/// Values used when a query parameter is missing or unparseable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub cpu_n: i64,
    pub memory_size: i64,
    pub io_delay_ms: i64,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            cpu_n: 35,
            memory_size: 100_000,
            io_delay_ms: 100,
        }
    }
}

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Workload ceilings
    pub limits: WorkloadLimits,

    /// Query parameter fallbacks
    pub defaults: QueryDefaults,
}

impl ServiceConfig {
    /// Check the configuration for values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }
        if !self.server.api_prefix.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "server.api_prefix must start with '/': {}",
                self.server.api_prefix
            )));
        }
        if self.limits.max_fibonacci_n == 0
            || self.limits.max_array_size == 0
            || self.limits.max_delay_ms == 0
        {
            return Err(ConfigError::ValidationError(
                "workload limits must be non-zero".to_string(),
            ));
        }
        if self.limits.max_fibonacci_n > MAX_FIBONACCI_N {
            return Err(ConfigError::ValidationError(format!(
                "limits.max_fibonacci_n must be at most {}: {}",
                MAX_FIBONACCI_N, self.limits.max_fibonacci_n
            )));
        }
        Ok(())
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Configuration manager trait
#[async_trait]
pub trait ConfigManager: Send + Sync {
    /// Get the current configuration
    async fn get_config(&self) -> ServiceConfig;

    /// Load configuration from a JSON file
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<(), ConfigError>;

    /// Save configuration to a JSON file
    async fn save_to_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<(), ConfigError>;

    /// Update configuration
    async fn update_config(&self, config: ServiceConfig) -> Result<(), ConfigError>;

    /// Apply `HOST`, `PORT`, `API_PREFIX`, `LOG_LEVEL` and `LOG_JSON` from the environment
    async fn apply_env_overrides(&self) -> Result<(), ConfigError>;
}

/// Basic implementation of the ConfigManager
pub struct BasicConfigManager {
    config: Arc<RwLock<ServiceConfig>>,
}

impl BasicConfigManager {
    /// Create a new BasicConfigManager with default configuration
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    /// Create a new BasicConfigManager holding the given configuration
    pub fn with_config(config: ServiceConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    fn apply_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.server.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("PORT={}: {}", port, e)))?;
        }
        if let Some(prefix) = lookup("API_PREFIX") {
            config.server.api_prefix = prefix;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            config.logging.json_format = matches!(json.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }
}

impl Default for BasicConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigManager for BasicConfigManager {
    async fn get_config(&self) -> ServiceConfig {
        self.config.read().await.clone()
    }

    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: ServiceConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), "Loaded configuration file");
        self.update_config(config).await
    }

    async fn save_to_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = self.get_config().await;
        let contents = serde_json::to_string_pretty(&config)
            .map_err(|e| ConfigError::SaveError(e.to_string()))?;

        tokio::fs::write(path, contents)
            .await
            .map_err(|e| ConfigError::SaveError(format!("{}: {}", path.display(), e)))
    }

    async fn update_config(&self, config: ServiceConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut current_config = self.config.write().await;
        *current_config = config;
        Ok(())
    }

    async fn apply_env_overrides(&self) -> Result<(), ConfigError> {
        let mut config = self.get_config().await;
        Self::apply_overrides(&mut config, |key| std::env::var(key).ok())?;
        self.update_config(config).await
    }
}
