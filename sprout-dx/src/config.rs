//! Configuration for sprout-dx
//!
//! Loaded once at startup from TOML (see `sprout_common::config` for file
//! resolution), then validated. Every tunable of the pipeline lives here:
//! tier thresholds, worker pool size, call timeouts, backends and
//! generator settings. Nothing is re-read at runtime.

use crate::pipeline::tiering::TierThresholds;
use serde::{Deserialize, Serialize};
use sprout_common::LoggingConfig;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Environment variable consulted when `[llm].api_key` is not set
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Config file could not be read or parsed
    #[error(transparent)]
    Load(#[from] sprout_common::Error),
}

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DxConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub tiers: TierThresholds,
    pub pool: PoolConfig,
    /// Classifier backends; the first entry is the primary backend
    pub backends: Vec<BackendConfig>,
    pub llm: LlmConfig,
    pub care_guide: CareGuideConfig,
}

impl Default for DxConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            tiers: TierThresholds::default(),
            pool: PoolConfig::default(),
            backends: vec![
                BackendConfig {
                    id: "vit".to_string(),
                    name: "General image classifier (ViT)".to_string(),
                    url: "http://127.0.0.1:8501/classify".to_string(),
                    health_url: Some("http://127.0.0.1:8501/health".to_string()),
                },
                BackendConfig {
                    id: "plantrecog".to_string(),
                    name: "PlantRecog specialist".to_string(),
                    url: "http://127.0.0.1:8502/classify".to_string(),
                    health_url: Some("http://127.0.0.1:8502/health".to_string()),
                },
            ],
            llm: LlmConfig::default(),
            care_guide: CareGuideConfig::default(),
        }
    }
}

impl DxConfig {
    /// Load from an optional TOML path, apply environment overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: DxConfig = sprout_common::config::load_toml_config(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.llm.api_key.is_none() {
            if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
                if !key.trim().is_empty() {
                    info!("LLM API key loaded from environment variable");
                    self.llm.api_key = Some(key);
                }
            }
        }
    }

    /// Validate every section; the first problem found is reported
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tiers.validate()?;

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_upload_bytes must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.server.default_conf_threshold) {
            return Err(ConfigError::Invalid(format!(
                "server.default_conf_threshold must be within [0, 1], got {}",
                self.server.default_conf_threshold
            )));
        }

        if self.pool.workers == 0 {
            return Err(ConfigError::Invalid("pool.workers must be >= 1".to_string()));
        }
        if self.pool.backend_timeout_ms == 0 || self.pool.generator_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "pool timeouts must be > 0 ms".to_string(),
            ));
        }

        if self.backends.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[backends]] entry is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.id.trim().is_empty() {
                return Err(ConfigError::Invalid("backend id must not be empty".to_string()));
            }
            if !seen.insert(backend.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend id '{}'",
                    backend.id
                )));
            }
            if backend.url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "backend '{}' has an empty url",
                    backend.id
                )));
            }
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm.temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }
        if self.care_guide.generic_subject.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "care_guide.generic_subject must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted image size
    pub max_upload_bytes: usize,
    /// Detections below this confidence are dropped unless overridden per request
    pub default_conf_threshold: f64,
    /// Allowed CORS origins for the web frontend
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
            max_upload_bytes: 10 * 1024 * 1024,
            default_conf_threshold: 0.01,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Concurrent backend/generator calls allowed process-wide
    pub workers: usize,
    pub backend_timeout_ms: u64,
    pub generator_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            backend_timeout_ms: 30_000,
            generator_timeout_ms: 60_000,
        }
    }
}

impl PoolConfig {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn generator_timeout(&self) -> Duration {
        Duration::from_millis(self.generator_timeout_ms)
    }
}

/// One classifier backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    pub name: String,
    /// Inference endpoint receiving raw image bytes
    pub url: String,
    /// Probed once during load; backend is considered loaded without it
    #[serde(default)]
    pub health_url: Option<String>,
}

/// Text generation backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 800,
        }
    }
}

/// Care guide generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareGuideConfig {
    /// Ask the text generator for plant-specific guides
    pub use_llm: bool,
    /// Serve the built-in guide when the text generator fails
    pub fallback_to_template: bool,
    /// Subject used when identification confidence is below the generic floor
    pub generic_subject: String,
}

impl Default for CareGuideConfig {
    fn default() -> Self {
        Self {
            use_llm: false,
            fallback_to_template: true,
            generic_subject: "common houseplant".to_string(),
        }
    }
}
