use std::fmt;
use thiserror::Error;

/// Pipeline stage a terminal error was raised in. Carried alongside the
/// cache key so a failed request can be reproduced from the log line alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Normalize,
    CacheLookup,
    Fetch,
    Parse,
    Store,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Normalize => "normalize",
            PipelineStage::CacheLookup => "cache-lookup",
            PipelineStage::Fetch => "fetch",
            PipelineStage::Parse => "parse",
            PipelineStage::Store => "store",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to portal: {message}")]
    Connect { message: String },

    #[error("portal returned HTTP {status}")]
    PortalStatus { status: u16 },

    #[error("portal rate limited the request")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Valid response, no matching case. A normal not-found outcome, never
    /// surfaced to the user as a failure.
    #[error("no matching record in portal response")]
    EmptyResult,

    /// The portal markup no longer matches the extraction rules.
    #[error("portal response shape changed: {context}")]
    ShapeChanged { context: String },

    #[error("store operation failed: {message}")]
    Store { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("zip bundle error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("{stage} failed for {key}: {source}")]
    Stage {
        key: String,
        stage: PipelineStage,
        #[source]
        source: Box<ScrapeError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScrapeError {
    /// Wrap with the query key and stage the error was raised in.
    pub fn with_stage(self, key: &str, stage: PipelineStage) -> Self {
        ScrapeError::Stage {
            key: key.to_string(),
            stage,
            source: Box::new(self),
        }
    }

    /// Whether a retry can reasonably change the outcome. Only transport
    /// failures qualify; validation and parse errors never do.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Timeout { .. }
            | ScrapeError::Connect { .. }
            | ScrapeError::RateLimited { .. } => true,
            ScrapeError::PortalStatus { status } => *status >= 500,
            ScrapeError::Http(e) => e.is_timeout() || e.is_connect(),
            ScrapeError::Stage { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScrapeError::EmptyResult => ErrorSeverity::Low,
            ScrapeError::Timeout { .. }
            | ScrapeError::Connect { .. }
            | ScrapeError::PortalStatus { .. }
            | ScrapeError::RateLimited { .. }
            | ScrapeError::Http(_) => ErrorSeverity::Medium,
            ScrapeError::Validation { .. }
            | ScrapeError::ShapeChanged { .. }
            | ScrapeError::Serialization(_)
            | ScrapeError::Csv(_)
            | ScrapeError::Zip(_)
            | ScrapeError::Config { .. }
            | ScrapeError::Cancelled => ErrorSeverity::High,
            ScrapeError::Store { .. } | ScrapeError::Io(_) => ErrorSeverity::Critical,
            ScrapeError::Stage { source, .. } => source.severity(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ScrapeError::Validation { field, reason } => {
                format!("Invalid input for {}: {}", field, reason)
            }
            ScrapeError::Timeout { .. } | ScrapeError::Connect { .. } => {
                "Could not reach the eCourts portal".to_string()
            }
            ScrapeError::PortalStatus { status } => {
                format!("The eCourts portal rejected the request (HTTP {})", status)
            }
            ScrapeError::RateLimited { .. } => {
                "The eCourts portal is rate limiting requests".to_string()
            }
            ScrapeError::ShapeChanged { .. } => {
                "The portal page layout has changed and could not be read".to_string()
            }
            ScrapeError::Store { .. } | ScrapeError::Io(_) => {
                "Could not write results to disk".to_string()
            }
            ScrapeError::Config { message } => format!("Configuration problem: {}", message),
            ScrapeError::Cancelled => "The request was cancelled".to_string(),
            ScrapeError::Stage { source, .. } => source.user_friendly_message(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ScrapeError::Validation { field, .. } => {
                format!("Check the value passed for {} and try again", field)
            }
            ScrapeError::Timeout { .. }
            | ScrapeError::Connect { .. }
            | ScrapeError::PortalStatus { .. }
            | ScrapeError::Http(_) => {
                "Check your network connection and retry in a few minutes".to_string()
            }
            ScrapeError::RateLimited { retry_after_secs } => match retry_after_secs {
                Some(secs) => format!("Wait at least {} seconds before retrying", secs),
                None => "Lower --concurrent-requests or retry later".to_string(),
            },
            ScrapeError::ShapeChanged { .. } => {
                "Report this so the extraction rules can be updated".to_string()
            }
            ScrapeError::Store { .. } | ScrapeError::Io(_) => {
                "Check disk space and permissions on the output directory".to_string()
            }
            ScrapeError::Config { .. } => {
                "Review the config file and command line flags".to_string()
            }
            ScrapeError::Stage { source, .. } => source.recovery_suggestion(),
            _ => "Retry the command; report the error if it persists".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
