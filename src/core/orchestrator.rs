//! Per-request pipeline: normalize, cache lookup, fetch, parse, store.
//! Retry policy lives in the transport; nothing here re-runs the parser
//! or the normalizer on failure. Cancellation is checked between stages,
//! never mid-fetch (the transport timeout covers that).

use crate::core::normalize::{self, QueryInput};
use crate::core::parser;
use crate::core::store::CacheStore;
use crate::domain::model::{
    cause_list_cache_key, CacheEntry, CachePayload, CaseRecord, CauseList,
};
use crate::domain::ports::{PortalClient, Storage};
use crate::utils::error::{PipelineStage, Result, ScrapeError};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Cooperative cancellation shared between a caller and in-flight
/// pipelines. Checked before each stage transition.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(CaseRecord),
    /// The portal answered; no case matched. Not an error.
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseLookup {
    pub key: String,
    pub outcome: LookupOutcome,
    pub from_cache: bool,
    /// Fetch attempts the transport needed; 0 on a cache hit.
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CauseListFetch {
    pub key: String,
    pub list: CauseList,
    pub from_cache: bool,
    pub attempts: u32,
}

pub struct Orchestrator<P: PortalClient, S: Storage> {
    client: P,
    store: CacheStore<S>,
    cache_ttl_secs: u64,
    cancel: CancelFlag,
}

impl<P: PortalClient, S: Storage> Orchestrator<P, S> {
    pub fn new(client: P, storage: S, cache_ttl: Duration) -> Self {
        Self {
            client,
            store: CacheStore::new(storage),
            cache_ttl_secs: cache_ttl.as_secs(),
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for cancelling requests running on this orchestrator.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    fn checkpoint(&self, key: &str, stage: PipelineStage) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled.with_stage(key, stage));
        }
        Ok(())
    }

    /// Run the full lookup pipeline for one raw query. `date` is the
    /// hearing date being asked about, `now` the moment freshness is
    /// judged against; both come from the caller so the pipeline itself
    /// never reads a clock.
    pub async fn lookup_case(
        &self,
        input: &QueryInput,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CaseLookup> {
        if self.cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        let query = normalize::normalize(input, date)?;
        let key = query.cache_key();
        tracing::debug!(key, "case lookup");

        self.checkpoint(&key, PipelineStage::CacheLookup)?;
        match self.store.get(&key).await {
            Ok(Some(entry)) if entry.is_fresh(now) => {
                if let CachePayload::Case(record) = entry.payload {
                    tracing::debug!(key, "cache hit");
                    return Ok(CaseLookup {
                        key,
                        outcome: LookupOutcome::Found(record),
                        from_cache: true,
                        attempts: 0,
                    });
                }
            }
            Ok(Some(_)) => tracing::debug!(key, "cache entry expired, refetching"),
            Ok(None) => {}
            Err(e) => return Err(e.with_stage(&key, PipelineStage::CacheLookup)),
        }

        self.checkpoint(&key, PipelineStage::Fetch)?;
        let raw = self
            .client
            .search_case(&query)
            .await
            .map_err(|e| e.with_stage(&key, PipelineStage::Fetch))?;

        self.checkpoint(&key, PipelineStage::Parse)?;
        let record = match parser::parse_case(&raw) {
            Ok(record) => record,
            Err(ScrapeError::EmptyResult) => {
                tracing::info!(key, "no matching case");
                return Ok(CaseLookup {
                    key,
                    outcome: LookupOutcome::NotFound,
                    from_cache: false,
                    attempts: raw.attempts,
                });
            }
            Err(e) => {
                if matches!(e, ScrapeError::ShapeChanged { .. }) {
                    // drift needs human eyes; a retry cannot help
                    tracing::error!(key, error = %e, alert = true, "portal markup drift");
                }
                return Err(e.with_stage(&key, PipelineStage::Parse));
            }
        };

        self.checkpoint(&key, PipelineStage::Store)?;
        let entry = CacheEntry::new(CachePayload::Case(record.clone()), self.cache_ttl_secs, now);
        self.store
            .put(&key, &entry)
            .await
            .map_err(|e| e.with_stage(&key, PipelineStage::Store))?;

        Ok(CaseLookup {
            key,
            outcome: LookupOutcome::Found(record),
            from_cache: false,
            attempts: raw.attempts,
        })
    }

    /// Fetch the cause list for a date, cache-first. An empty-result
    /// response is a valid day with no listings, not a failure.
    pub async fn fetch_cause_list(
        &self,
        date: NaiveDate,
        court: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CauseListFetch> {
        let key = cause_list_cache_key(date, court);
        tracing::debug!(key, "cause list fetch");

        self.checkpoint(&key, PipelineStage::CacheLookup)?;
        match self.store.get(&key).await {
            Ok(Some(entry)) if entry.is_fresh(now) => {
                if let CachePayload::CauseList(list) = entry.payload {
                    tracing::debug!(key, "cache hit");
                    return Ok(CauseListFetch {
                        key,
                        list,
                        from_cache: true,
                        attempts: 0,
                    });
                }
            }
            Ok(Some(_)) => tracing::debug!(key, "cache entry expired, refetching"),
            Ok(None) => {}
            Err(e) => return Err(e.with_stage(&key, PipelineStage::CacheLookup)),
        }

        self.checkpoint(&key, PipelineStage::Fetch)?;
        let raw = self
            .client
            .fetch_cause_list(date, court)
            .await
            .map_err(|e| e.with_stage(&key, PipelineStage::Fetch))?;

        self.checkpoint(&key, PipelineStage::Parse)?;
        let list = match parser::parse_cause_list(&raw, date) {
            Ok(mut list) => {
                list.court = court.map(str::to_string);
                list
            }
            Err(ScrapeError::EmptyResult) => {
                tracing::info!(key, "no listings for this date");
                CauseList {
                    date,
                    court: court.map(str::to_string),
                    entries: Vec::new(),
                }
            }
            Err(e) => {
                if matches!(e, ScrapeError::ShapeChanged { .. }) {
                    tracing::error!(key, error = %e, alert = true, "portal markup drift");
                }
                return Err(e.with_stage(&key, PipelineStage::Parse));
            }
        };

        self.checkpoint(&key, PipelineStage::Store)?;
        let entry = CacheEntry::new(
            CachePayload::CauseList(list.clone()),
            self.cache_ttl_secs,
            now,
        );
        self.store
            .put(&key, &entry)
            .await
            .map_err(|e| e.with_stage(&key, PipelineStage::Store))?;

        Ok(CauseListFetch {
            key,
            list,
            from_cache: false,
            attempts: raw.attempts,
        })
    }
}

impl<P, S> Orchestrator<P, S>
where
    P: PortalClient + 'static,
    S: Storage + 'static,
{
    /// Run one lookup task per query, concurrently. Admission control
    /// against the portal is the transport's semaphore; this just fans
    /// out. Results come back in input order.
    pub async fn lookup_many(
        self: &Arc<Self>,
        inputs: Vec<QueryInput>,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Vec<Result<CaseLookup>> {
        let mut set = JoinSet::new();
        let count = inputs.len();
        for (index, input) in inputs.into_iter().enumerate() {
            let this = Arc::clone(self);
            set.spawn(async move { (index, this.lookup_case(&input, date, now).await) });
        }

        let mut results: Vec<Option<Result<CaseLookup>>> =
            (0..count).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "lookup task failed"),
            }
        }
        results
            .into_iter()
            .map(|slot| slot.unwrap_or(Err(ScrapeError::Cancelled)))
            .collect()
    }
}
