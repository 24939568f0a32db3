//! Query validation and canonicalization. Pure functions, no I/O: the
//! caller supplies the query date so nothing here reads a clock.

use crate::domain::model::CaseQuery;
use crate::utils::error::{Result, ScrapeError};
use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Earliest filing year accepted as plausible.
const MIN_CASE_YEAR: i32 = 1950;

/// Raw, unvalidated lookup parameters as they arrive from the CLI.
#[derive(Debug, Clone, Default)]
pub struct QueryInput {
    pub cnr: Option<String>,
    pub case_type: Option<String>,
    pub number: Option<u32>,
    pub year: Option<i32>,
}

impl QueryInput {
    pub fn from_cnr(cnr: &str) -> Self {
        Self {
            cnr: Some(cnr.to_string()),
            ..Self::default()
        }
    }
}

/// Validate and canonicalize a lookup into a `CaseQuery` for the given
/// hearing date. Idempotent: normalizing an already-canonical input
/// produces the same query.
pub fn normalize(input: &QueryInput, date: NaiveDate) -> Result<CaseQuery> {
    let cnr = input.cnr.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let has_triple_part =
        input.case_type.is_some() || input.number.is_some() || input.year.is_some();

    match (cnr, has_triple_part) {
        (Some(_), true) => Err(ScrapeError::Validation {
            field: "query".to_string(),
            reason: "provide either a CNR or a case-type/number/year triple, not both"
                .to_string(),
        }),
        (Some(raw), false) => Ok(CaseQuery::Cnr {
            cnr: normalize_cnr(raw, date)?,
            date,
        }),
        (None, true) => normalize_triple(input, date),
        (None, false) => Err(ScrapeError::Validation {
            field: "query".to_string(),
            reason: "no CNR or case-type/number/year triple given".to_string(),
        }),
    }
}

/// Canonicalize a CNR: strip whitespace, uppercase, then check the
/// expected shape (two state-code letters, alphanumeric body, four
/// trailing digits for the filing year). Real CNRs are 16 characters;
/// a couple of portals pad the case number, so up to 18 is accepted.
pub fn normalize_cnr(raw: &str, date: NaiveDate) -> Result<String> {
    let canonical: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let pattern = Regex::new(r"^[A-Z]{2}[A-Z0-9]{10,12}[0-9]{4}$").unwrap();
    if !pattern.is_match(&canonical) {
        return Err(ScrapeError::Validation {
            field: "cnr".to_string(),
            reason: format!(
                "'{}' is not a valid CNR (expected 16-18 uppercase alphanumeric \
                 characters starting with a state code)",
                canonical
            ),
        });
    }

    let filing_year: i32 = canonical[canonical.len() - 4..]
        .parse()
        .map_err(|_| ScrapeError::Validation {
            field: "cnr".to_string(),
            reason: "CNR does not end in a filing year".to_string(),
        })?;
    check_year("cnr", filing_year, date)?;

    Ok(canonical)
}

fn normalize_triple(input: &QueryInput, date: NaiveDate) -> Result<CaseQuery> {
    let case_type = input
        .case_type
        .as_deref()
        .ok_or_else(|| missing_field("case_type"))?;
    let number = input.number.ok_or_else(|| missing_field("number"))?;
    let year = input.year.ok_or_else(|| missing_field("year"))?;

    let case_type = case_type.trim().to_ascii_uppercase();
    let type_pattern = Regex::new(r"^[A-Z][A-Z0-9().-]{0,9}$").unwrap();
    if !type_pattern.is_match(&case_type) {
        return Err(ScrapeError::Validation {
            field: "case_type".to_string(),
            reason: format!("'{}' is not a recognized case type code", case_type),
        });
    }

    if number == 0 {
        return Err(ScrapeError::Validation {
            field: "number".to_string(),
            reason: "case number must be positive".to_string(),
        });
    }

    check_year("year", year, date)?;

    Ok(CaseQuery::Number {
        case_type,
        number,
        year,
        date,
    })
}

fn check_year(field: &str, year: i32, date: NaiveDate) -> Result<()> {
    let max_year = date.year() + 1;
    if year < MIN_CASE_YEAR || year > max_year {
        return Err(ScrapeError::Validation {
            field: field.to_string(),
            reason: format!(
                "year {} outside plausible range {}-{}",
                year, MIN_CASE_YEAR, max_year
            ),
        });
    }
    Ok(())
}

fn missing_field(field: &str) -> ScrapeError {
    ScrapeError::Validation {
        field: field.to_string(),
        reason: "required for a case-type/number/year lookup".to_string(),
    }
}
