//! HTTP transport against the eCourts portal. The only place status codes
//! and retry policy are interpreted; callers see either a body to parse or
//! a typed transport error.

use crate::domain::model::CaseQuery;
use crate::domain::ports::{ConfigProvider, PortalClient, RawResponse, ResponseKind};
use crate::utils::error::{Result, ScrapeError};
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const USER_AGENT: &str = concat!("ecourts-scraper/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

pub struct EcourtsClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    // admission control: bounded in-flight requests against the portal
    limiter: Arc<Semaphore>,
}

impl EcourtsClient {
    pub fn new(config: &impl ConfigProvider) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                max_retries: config.max_retries(),
                base_delay: config.retry_base_delay(),
                ..RetryPolicy::default()
            },
            limiter: Arc::new(Semaphore::new(config.concurrent_requests().max(1))),
        })
    }

    async fn get_with_retry(
        &self,
        url: String,
        params: Vec<(&'static str, String)>,
    ) -> Result<RawResponse> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ScrapeError::Cancelled)?;

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.get_once(&url, &params).await {
                Ok((body, kind)) => {
                    return Ok(RawResponse {
                        body,
                        kind,
                        attempts,
                    })
                }
                Err(e) if e.is_transient() && attempts <= self.retry.max_retries => {
                    let backoff = self.backoff_delay(attempts, &e);
                    tracing::warn!(
                        error = %e,
                        attempt = attempts,
                        max_retries = self.retry.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying portal request"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<(String, ResponseKind)> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ScrapeError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            return Err(ScrapeError::PortalStatus {
                status: status.as_u16(),
            });
        }

        let kind = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.contains("json"))
            .map_or(ResponseKind::Html, |_| ResponseKind::Json);

        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(url, e))?;
        Ok((body, kind))
    }

    /// Exponential backoff with full jitter, capped at `max_delay`. A
    /// rate-limit response with a Retry-After header overrides the curve.
    fn backoff_delay(&self, attempt: u32, error: &ScrapeError) -> Duration {
        if let ScrapeError::RateLimited {
            retry_after_secs: Some(secs),
        } = error
        {
            let capped_ms = Duration::from_secs((*secs).min(30)).as_millis() as u64;
            let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
            let jittered_ms = ((capped_ms as f64) * jitter_factor).round() as u64;
            return Duration::from_millis(jittered_ms.max(100));
        }

        let exponential = self.retry.base_delay.saturating_mul(1u32 << attempt.min(10));
        let cap_ms = exponential.min(self.retry.max_delay).as_millis() as u64;
        let jittered_ms = rand::thread_rng().gen_range(0..=cap_ms);
        Duration::from_millis(jittered_ms.max(10))
    }
}

fn classify_request_error(url: &str, error: reqwest::Error) -> ScrapeError {
    if error.is_timeout() {
        ScrapeError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        ScrapeError::Connect {
            message: error.to_string(),
        }
    } else {
        ScrapeError::Http(error)
    }
}

#[async_trait]
impl PortalClient for EcourtsClient {
    async fn search_case(&self, query: &CaseQuery) -> Result<RawResponse> {
        let url = format!("{}/cases/search", self.base_url);
        let params = match query {
            CaseQuery::Cnr { cnr, date } => {
                vec![("cnr", cnr.clone()), ("date", date.to_string())]
            }
            CaseQuery::Number {
                case_type,
                number,
                year,
                date,
            } => vec![
                ("case_type", case_type.clone()),
                ("number", number.to_string()),
                ("year", year.to_string()),
                ("date", date.to_string()),
            ],
        };
        self.get_with_retry(url, params).await
    }

    async fn fetch_cause_list(
        &self,
        date: NaiveDate,
        court: Option<&str>,
    ) -> Result<RawResponse> {
        let url = format!("{}/causelist", self.base_url);
        let mut params = vec![("date", date.to_string())];
        if let Some(court) = court {
            params.push(("court", court.to_string()));
        }
        self.get_with_retry(url, params).await
    }
}
