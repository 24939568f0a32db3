pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::Settings;

pub use adapters::export;
pub use adapters::http::EcourtsClient;
pub use adapters::storage::LocalStorage;
pub use crate::core::normalize::QueryInput;
pub use crate::core::orchestrator::{
    CancelFlag, CaseLookup, CauseListFetch, LookupOutcome, Orchestrator,
};
pub use crate::core::store::{CacheStore, PutOutcome};
pub use utils::error::{Result, ScrapeError};
