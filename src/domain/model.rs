use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which hearing day a lookup targets. Resolved to a concrete date at the
/// CLI edge; pure logic only ever sees the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Day {
    Today,
    Tomorrow,
}

impl Day {
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Day::Today => today,
            Day::Tomorrow => today.succ_opt().unwrap_or(today),
        }
    }
}

/// A normalized, validated case lookup. Produced only by the normalizer;
/// the canonical key form below is the single source of storage naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseQuery {
    Cnr {
        cnr: String,
        date: NaiveDate,
    },
    Number {
        case_type: String,
        number: u32,
        year: i32,
        date: NaiveDate,
    },
}

impl CaseQuery {
    /// Canonical string form. Same logical query, same key, same file.
    pub fn cache_key(&self) -> String {
        match self {
            CaseQuery::Cnr { cnr, date } => format!("cnr-{}-{}", cnr, date),
            CaseQuery::Number {
                case_type,
                number,
                year,
                date,
            } => format!("case-{}-{}-{}-{}", case_type, number, year, date),
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            CaseQuery::Cnr { date, .. } => *date,
            CaseQuery::Number { date, .. } => *date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Listed,
    NotListed,
    Disposed,
    #[default]
    Unknown,
}

/// A single case as extracted from a portal response. Immutable once
/// parsed; identified by CNR. Serde aliases accept the portal's own field
/// names in JSON responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(alias = "CNR")]
    pub cnr: String,
    #[serde(default, alias = "CaseType")]
    pub case_type: Option<String>,
    #[serde(alias = "CourtName")]
    pub court_name: String,
    #[serde(default, alias = "SerialNumber")]
    pub serial_number: Option<u32>,
    #[serde(default, alias = "ListedOn")]
    pub listed_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: CaseStatus,
}

/// One row of a daily cause list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseListEntry {
    #[serde(alias = "SerialNumber")]
    pub serial_number: u32,
    #[serde(alias = "CourtName")]
    pub court_name: String,
    #[serde(default, alias = "CNR")]
    pub case_reference: Option<String>,
    #[serde(default, alias = "Parties")]
    pub party_names: Option<String>,
    #[serde(default, alias = "Purpose")]
    pub purpose: Option<String>,
}

/// All cases scheduled for hearing on a given date, keyed by that date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseList {
    pub date: NaiveDate,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(alias = "cases")]
    pub entries: Vec<CauseListEntry>,
}

impl CauseList {
    pub fn cache_key(&self) -> String {
        cause_list_cache_key(self.date, self.court.as_deref())
    }
}

pub fn cause_list_cache_key(date: NaiveDate, court: Option<&str>) -> String {
    match court {
        Some(court) => format!("causelist-{}-{}", court, date),
        None => format!("causelist-{}", date),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePayload {
    Case(CaseRecord),
    CauseList(CauseList),
}

/// On-disk envelope around a fetched payload. Owned exclusively by the
/// store; freshness is judged against the fetch timestamp, never re-read
/// from an ambient clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub sha256: String,
    pub payload: CachePayload,
}

impl CacheEntry {
    pub fn new(payload: CachePayload, ttl_secs: u64, fetched_at: DateTime<Utc>) -> Self {
        let sha256 = content_digest(&payload);
        Self {
            fetched_at,
            ttl_secs,
            sha256,
            payload,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        age >= chrono::Duration::zero() && age.num_seconds() < self.ttl_secs as i64
    }
}

/// sha256 over the payload's canonical JSON encoding. Struct fields keep
/// declaration order under serde_json, so equal payloads hash equal.
pub fn content_digest(payload: &CachePayload) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> CaseRecord {
        CaseRecord {
            cnr: "MHABC1000123452023".to_string(),
            case_type: None,
            court_name: "District Court Mumbai".to_string(),
            serial_number: Some(23),
            listed_date: NaiveDate::from_ymd_opt(2025, 10, 8),
            status: CaseStatus::Listed,
        }
    }

    #[test]
    fn test_day_resolution() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        assert_eq!(Day::Today.resolve(today), today);
        assert_eq!(
            Day::Tomorrow.resolve(today),
            NaiveDate::from_ymd_opt(2025, 10, 9).unwrap()
        );
    }

    #[test]
    fn test_cache_key_forms() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        let cnr = CaseQuery::Cnr {
            cnr: "MHABC1000123452023".to_string(),
            date,
        };
        assert_eq!(cnr.cache_key(), "cnr-MHABC1000123452023-2025-10-08");

        let triple = CaseQuery::Number {
            case_type: "CR".to_string(),
            number: 123,
            year: 2023,
            date,
        };
        assert_eq!(triple.cache_key(), "case-CR-123-2023-2025-10-08");

        assert_eq!(cause_list_cache_key(date, None), "causelist-2025-10-08");
    }

    #[test]
    fn test_record_accepts_portal_field_names() {
        let json = r#"{
            "CNR": "MHABC1000123452023",
            "CourtName": "District Court Mumbai",
            "SerialNumber": 23,
            "ListedOn": "2025-10-08"
        }"#;
        let record: CaseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.cnr, "MHABC1000123452023");
        assert_eq!(record.court_name, "District Court Mumbai");
        assert_eq!(record.serial_number, Some(23));
        assert_eq!(record.listed_date, NaiveDate::from_ymd_opt(2025, 10, 8));
        assert_eq!(record.status, CaseStatus::Unknown);
    }

    #[test]
    fn test_cause_list_accepts_cases_alias() {
        let json = r#"{
            "date": "2025-10-08",
            "cases": [
                {"SerialNumber": 1, "CourtName": "High Court Delhi"},
                {"SerialNumber": 2, "CourtName": "District Court Pune"}
            ]
        }"#;
        let list: CauseList = serde_json::from_str(json).unwrap();
        assert_eq!(list.entries.len(), 2);
        assert_eq!(list.entries[0].court_name, "High Court Delhi");
    }

    #[test]
    fn test_cache_entry_freshness() {
        let fetched = chrono::Utc.with_ymd_and_hms(2025, 10, 8, 9, 0, 0).unwrap();
        let entry = CacheEntry::new(CachePayload::Case(sample_record()), 3600, fetched);

        assert!(entry.is_fresh(fetched + chrono::Duration::minutes(30)));
        assert!(!entry.is_fresh(fetched + chrono::Duration::hours(2)));
        // clock skew: an entry from the future is not trusted as fresh
        assert!(!entry.is_fresh(fetched - chrono::Duration::minutes(1)));
    }

    #[test]
    fn test_content_digest_is_stable() {
        let a = CacheEntry::new(
            CachePayload::Case(sample_record()),
            60,
            chrono::Utc.with_ymd_and_hms(2025, 10, 8, 9, 0, 0).unwrap(),
        );
        let b = CacheEntry::new(
            CachePayload::Case(sample_record()),
            60,
            chrono::Utc.with_ymd_and_hms(2025, 10, 8, 10, 0, 0).unwrap(),
        );
        assert_eq!(a.sha256, b.sha256);
    }
}
