use crate::domain::model::CaseQuery;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// What the portal answered with, before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Html,
    Json,
}

/// Raw portal response plus how many attempts the transport needed.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub body: String,
    pub kind: ResponseKind,
    pub attempts: u32,
}

/// Transport seam. Implementations own retry, timeout and admission
/// control; callers never see a transient failure that a retry fixed.
#[async_trait]
pub trait PortalClient: Send + Sync {
    async fn search_case(&self, query: &CaseQuery) -> Result<RawResponse>;

    async fn fetch_cause_list(
        &self,
        date: NaiveDate,
        court: Option<&str>,
    ) -> Result<RawResponse>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn output_path(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn max_retries(&self) -> u32;
    fn retry_base_delay(&self) -> Duration;
    fn cache_ttl(&self) -> Duration;
    fn concurrent_requests(&self) -> usize;
    fn court(&self) -> Option<&str> {
        None
    }
}
