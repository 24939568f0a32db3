use crate::config::Settings;
use crate::utils::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional config file. Every field falls back to `Settings` defaults;
/// the CLI overrides both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScraperToml {
    pub portal: Option<PortalSection>,
    pub cache: Option<CacheSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalSection {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub concurrent_requests: Option<usize>,
    pub court: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSection {
    pub ttl_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub directory: Option<String>,
}

impl ScraperToml {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ScrapeError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ECOURTS_BASE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Overlay this file's values on the built-in defaults.
    pub fn into_settings(self) -> Settings {
        let mut settings = Settings::default();

        if let Some(portal) = self.portal {
            if let Some(base_url) = portal.base_url {
                settings.base_url = base_url;
            }
            if let Some(timeout) = portal.timeout_seconds {
                settings.timeout_seconds = timeout;
            }
            if let Some(retries) = portal.retry_attempts {
                settings.max_retries = retries;
            }
            if let Some(delay) = portal.retry_delay_ms {
                settings.retry_delay_ms = delay;
            }
            if let Some(concurrent) = portal.concurrent_requests {
                settings.concurrent_requests = concurrent;
            }
            settings.court = portal.court;
        }
        if let Some(cache) = self.cache {
            if let Some(ttl) = cache.ttl_minutes {
                settings.cache_ttl_minutes = ttl;
            }
        }
        if let Some(output) = self.output {
            if let Some(directory) = output.directory {
                settings.output_path = directory;
            }
        }

        settings
    }
}
