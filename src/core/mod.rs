pub mod normalize;
pub mod orchestrator;
pub mod parser;
pub mod store;

pub use crate::domain::model::{
    CacheEntry, CachePayload, CaseQuery, CaseRecord, CaseStatus, CauseList, CauseListEntry, Day,
};
pub use crate::domain::ports::{ConfigProvider, PortalClient, RawResponse, ResponseKind, Storage};
pub use crate::utils::error::Result;
