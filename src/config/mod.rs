pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_range, validate_url, Validate};
use std::time::Duration;

pub use toml_config::ScraperToml;

pub const DEFAULT_PORTAL_URL: &str = "https://services.ecourts.gov.in/ecourtindia_v6";

/// Fully resolved runtime settings: defaults, overlaid by the config
/// file, overlaid by explicit CLI flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub output_path: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub cache_ttl_minutes: u64,
    pub concurrent_requests: usize,
    pub court: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PORTAL_URL.to_string(),
            output_path: "./data".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_ms: 500,
            cache_ttl_minutes: 60,
            concurrent_requests: 4,
            court: None,
        }
    }
}

impl ConfigProvider for Settings {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn court(&self) -> Option<&str> {
        self.court.as_deref()
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("base_url", &self.base_url)?;
        validate_path("output_path", &self.output_path)?;
        validate_range("timeout_seconds", self.timeout_seconds, 1, 300)?;
        validate_range("max_retries", self.max_retries, 0, 10)?;
        validate_range("cache_ttl_minutes", self.cache_ttl_minutes, 1, 24 * 60)?;
        validate_range("concurrent_requests", self.concurrent_requests, 1, 16)?;
        Ok(())
    }
}

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use super::{ScraperToml, Settings};
    use crate::core::normalize::QueryInput;
    use crate::domain::model::Day;
    use crate::utils::error::{Result, ScrapeError};
    use crate::utils::validation::Validate;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "ecourts-scraper")]
    #[command(about = "Look up eCourts case status and download daily cause lists")]
    pub struct CliConfig {
        /// CNR numbers to look up (e.g. MHABC1000123452023)
        #[arg(long, value_delimiter = ',')]
        pub cnr: Vec<String>,

        /// Case type for a case-type/number/year lookup (e.g. CR)
        #[arg(long)]
        pub case_type: Option<String>,

        /// Case number (e.g. 123)
        #[arg(long)]
        pub number: Option<u32>,

        /// Case year (e.g. 2023)
        #[arg(long)]
        pub year: Option<i32>,

        /// Check listings for today (default)
        #[arg(long)]
        pub today: bool,

        /// Check listings for tomorrow
        #[arg(long, conflicts_with = "today")]
        pub tomorrow: bool,

        /// Download the cause list for the selected day
        #[arg(long)]
        pub causelist: bool,

        /// Also bundle the cause list files into a zip archive
        #[arg(long, requires = "causelist")]
        pub bundle: bool,

        /// Restrict the cause list to one court
        #[arg(long)]
        pub court: Option<String>,

        /// Directory results are written to (default ./data)
        #[arg(long)]
        pub output_path: Option<String>,

        /// TOML config file with portal/cache settings
        #[arg(long)]
        pub config: Option<PathBuf>,

        #[arg(long, help = "Portal base URL override")]
        pub base_url: Option<String>,

        #[arg(long, help = "Per-attempt request timeout in seconds")]
        pub timeout_seconds: Option<u64>,

        #[arg(long, help = "Retries for transient portal failures")]
        pub max_retries: Option<u32>,

        #[arg(long, help = "How long cached results stay fresh")]
        pub cache_ttl_minutes: Option<u64>,

        #[arg(long, help = "Concurrent portal requests")]
        pub concurrent_requests: Option<usize>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log system resource usage")]
        pub monitor: bool,
    }

    impl CliConfig {
        pub fn day(&self) -> Day {
            if self.tomorrow {
                Day::Tomorrow
            } else {
                Day::Today
            }
        }

        pub fn has_case_query(&self) -> bool {
            !self.cnr.is_empty()
                || self.case_type.is_some()
                || self.number.is_some()
                || self.year.is_some()
        }

        /// One raw query per `--cnr`, plus the triple if given. Field
        /// validation happens in the normalizer.
        pub fn query_inputs(&self) -> Vec<QueryInput> {
            let mut inputs: Vec<QueryInput> =
                self.cnr.iter().map(|cnr| QueryInput::from_cnr(cnr)).collect();
            if self.case_type.is_some() || self.number.is_some() || self.year.is_some() {
                inputs.push(QueryInput {
                    cnr: None,
                    case_type: self.case_type.clone(),
                    number: self.number,
                    year: self.year,
                });
            }
            inputs
        }

        /// Resolve file + flag layers into runtime settings.
        pub fn settings(&self) -> Result<Settings> {
            let mut settings = match &self.config {
                Some(path) => ScraperToml::from_file(path)?.into_settings(),
                None => Settings::default(),
            };

            if let Some(output_path) = &self.output_path {
                settings.output_path = output_path.clone();
            }
            if let Some(base_url) = &self.base_url {
                settings.base_url = base_url.clone();
            }
            if let Some(timeout) = self.timeout_seconds {
                settings.timeout_seconds = timeout;
            }
            if let Some(retries) = self.max_retries {
                settings.max_retries = retries;
            }
            if let Some(ttl) = self.cache_ttl_minutes {
                settings.cache_ttl_minutes = ttl;
            }
            if let Some(concurrent) = self.concurrent_requests {
                settings.concurrent_requests = concurrent;
            }
            if let Some(court) = &self.court {
                settings.court = Some(court.clone());
            }

            settings.validate()?;
            Ok(settings)
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if !self.causelist && !self.has_case_query() {
                return Err(ScrapeError::Validation {
                    field: "query".to_string(),
                    reason: "pass --cnr, a --case-type/--number/--year triple, or --causelist"
                        .to_string(),
                });
            }
            Ok(())
        }
    }

}
