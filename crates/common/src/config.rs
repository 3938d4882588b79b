//! Application configuration.

use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Generative AI configuration.
    #[serde(default)]
    pub ai: AiConfig,
    /// Geocoding configuration.
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Retention sweep configuration.
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Development mode. Relaxes the AI key requirement.
    #[serde(default)]
    pub debug: bool,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Generative AI (Gemini) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// API key. Required outside debug mode.
    #[serde(default)]
    pub api_key: Option<String>,
    /// REST base URL.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    /// Model used for text and vision generation.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    /// Model used for text embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Geocoding (Nominatim) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    /// REST base URL.
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// User agent sent with every request, as the Nominatim usage policy requires.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Retention sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Issues older than this many days are purged.
    #[serde(default = "default_issue_days")]
    pub issue_days: i64,
    /// Interval between sweeps in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            issue_days: default_issue_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generation_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_user_agent() -> String {
    "community_watch_app".to_string()
}

const fn default_issue_days() -> i64 {
    90
}

const fn default_sweep_interval_secs() -> u64 {
    24 * 60 * 60
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `COMMUNITYWATCH_ENV`)
    /// 3. Environment variables with `COMMUNITYWATCH__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env =
            std::env::var("COMMUNITYWATCH_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("COMMUNITYWATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("COMMUNITYWATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check settings that cannot be expressed through serde defaults.
    ///
    /// A missing AI key is fatal in production and only a warning in debug mode,
    /// where the AI-backed features degrade to their fallbacks.
    pub fn validate(&self) -> AppResult<()> {
        let has_key = self
            .ai
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());

        if !has_key {
            if self.server.debug {
                tracing::warn!("AI API key is not set; AI features will return fallbacks");
            } else {
                return Err(AppError::Config(
                    "ai.api_key must be set outside debug mode".to_string(),
                ));
            }
        }

        if self.retention.issue_days <= 0 {
            return Err(AppError::Config(
                "retention.issue_days must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(debug: bool, api_key: Option<&str>) -> Config {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                debug,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/communitywatch".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
            },
            ai: AiConfig {
                api_key: api_key.map(ToString::to_string),
                ..AiConfig::default()
            },
            geocoding: GeocodingConfig::default(),
            retention: RetentionConfig::default(),
        }
    }

    #[test]
    fn test_missing_key_fails_in_production() {
        assert!(config(false, None).validate().is_err());
        assert!(config(false, Some("  ")).validate().is_err());
    }

    #[test]
    fn test_missing_key_allowed_in_debug() {
        assert!(config(true, None).validate().is_ok());
    }

    #[test]
    fn test_key_present() {
        assert!(config(false, Some("secret")).validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let retention = RetentionConfig::default();
        assert_eq!(retention.issue_days, 90);
        assert_eq!(retention.sweep_interval_secs, 86_400);
        assert_eq!(GeocodingConfig::default().user_agent, "community_watch_app");
    }
}
