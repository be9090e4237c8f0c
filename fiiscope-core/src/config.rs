//! Scraper configuration.
//!
//! Stored as TOML; every key is optional and falls back to the defaults below.
//!
//! ```toml
//! [cache]
//! path = "/tmp/fiiscope-cache.txt"
//! ttl_hours = 24
//!
//! [http]
//! timeout_secs = 30
//! max_retries = 2
//!
//! [sources]
//! trust_order = ["fundamentus", "fundsexplorer", "investidor10"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::provider::TrustOrder;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("fiiscope-cache.txt"),
            ttl_hours: 24,
        }
    }
}

/// Longest accepted cache TTL (ten years).
pub const MAX_TTL_HOURS: u64 = 24 * 365 * 10;

/// Upper bound on retries per fetch, so backoff stays within minutes.
pub const MAX_RETRIES: u32 = 10;

impl CacheConfig {
    /// TTL as a duration, saturating at [`MAX_TTL_HOURS`] for unvalidated values.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours.min(MAX_TTL_HOURS) as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            base_delay_ms: 500,
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub trust_order: TrustOrder,
    pub fundamentus_base_url: String,
    pub fundsexplorer_base_url: String,
    pub investidor10_base_url: String,
    /// Auxiliary filing location; `{cnpj}` is replaced by the fund's registration number.
    pub filing_url_template: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            trust_order: TrustOrder::default(),
            fundamentus_base_url: "https://fundamentus.com.br".into(),
            fundsexplorer_base_url: "https://www.fundsexplorer.com.br".into(),
            investidor10_base_url: "https://investidor10.com.br".into(),
            filing_url_template: concat!(
                "https://fnet.bmfbovespa.com.br/fnet/publico/",
                "abrirGerenciadorDocumentosCVM?cnpjFundo={cnpj}"
            )
            .into(),
        }
    }
}

impl ScraperConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ScraperConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_hours == 0 {
            return Err(ConfigError::Invalid("cache.ttl_hours must be > 0".into()));
        }
        if self.cache.ttl_hours > MAX_TTL_HOURS {
            return Err(ConfigError::Invalid(format!(
                "cache.ttl_hours must be <= {MAX_TTL_HOURS}"
            )));
        }
        if self.http.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "http.max_retries must be <= {MAX_RETRIES}"
            )));
        }
        if !self.sources.filing_url_template.contains("{cnpj}") {
            return Err(ConfigError::Invalid(
                "sources.filing_url_template must contain {cnpj}".into(),
            ));
        }
        Ok(())
    }
}
