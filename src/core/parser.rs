//! Extraction of typed records from raw portal responses.
//!
//! The portal answers with server-rendered HTML (primary) or JSON. Markup
//! drift and missing optional fields are everyday events, so extraction is
//! deliberately defensive: optional fields degrade to `None`/`Unknown`,
//! rows may appear in any order, and only a missing *section* is treated
//! as drift. Two failure kinds matter to callers and are kept distinct:
//! `EmptyResult` (valid page, no matching case) and `ShapeChanged`
//! (extraction rules no longer fit the markup).

use crate::domain::model::{CaseRecord, CaseStatus, CauseList, CauseListEntry};
use crate::domain::ports::{RawResponse, ResponseKind};
use crate::utils::error::{Result, ScrapeError};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

// Portal markup anchors. Kept in one place: when the live portal drifts,
// these are what get re-validated against fresh samples.
const CASE_TABLE_SELECTOR: &str = "table.case-details";
const CAUSE_LIST_SELECTOR: &str = "table.cause-list";
const NO_RECORDS_SELECTOR: &str = ".no-records";
const NO_RECORDS_TEXT: &str = "record not found";

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Extract a single case record from a case-status response.
pub fn parse_case(raw: &RawResponse) -> Result<CaseRecord> {
    match raw.kind {
        ResponseKind::Json => parse_case_json(&raw.body),
        ResponseKind::Html => parse_case_html(&raw.body),
    }
}

/// Extract a full cause list for `date` from a cause-list response.
pub fn parse_cause_list(raw: &RawResponse, date: NaiveDate) -> Result<CauseList> {
    match raw.kind {
        ResponseKind::Json => parse_cause_list_json(&raw.body, date),
        ResponseKind::Html => parse_cause_list_html(&raw.body, date),
    }
}

fn parse_case_html(body: &str) -> Result<CaseRecord> {
    let document = Html::parse_document(body);
    let table_selector = Selector::parse(CASE_TABLE_SELECTOR).unwrap();

    let Some(table) = document.select(&table_selector).next() else {
        if is_no_records_page(&document, body) {
            return Err(ScrapeError::EmptyResult);
        }
        return Err(ScrapeError::ShapeChanged {
            context: format!("case-status page has no '{}' section", CASE_TABLE_SELECTOR),
        });
    };

    // Label/value rows may come in any order; collect them all first.
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("th, td").unwrap();
    let mut fields: Vec<(String, String)> = Vec::new();
    for row in table.select(&row_selector) {
        let cells: Vec<String> = row.select(&cell_selector).map(|c| cell_text(&c)).collect();
        if cells.len() >= 2 {
            fields.push((field_label(&cells[0]), cells[1..].join(" ").trim().to_string()));
        }
    }

    let lookup = |label: &str| -> Option<&str> {
        fields
            .iter()
            .find(|(key, value)| key == label && !value.is_empty())
            .map(|(_, value)| value.as_str())
    };

    let cnr = lookup("cnr").ok_or_else(|| ScrapeError::ShapeChanged {
        context: "case-details table has no CNR row".to_string(),
    })?;
    let court_name = lookup("courtname").ok_or_else(|| ScrapeError::ShapeChanged {
        context: "case-details table has no court name row".to_string(),
    })?;

    let serial_number = lookup("serialnumber").and_then(|s| match s.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(value = s, "unreadable serial number, dropping");
            None
        }
    });
    let listed_date = lookup("listedon")
        .or_else(|| lookup("listeddate"))
        .and_then(parse_portal_date);
    let status = lookup("status").map(parse_status).unwrap_or_default();

    Ok(CaseRecord {
        cnr: cnr.to_string(),
        case_type: lookup("casetype").map(str::to_string),
        court_name: court_name.to_string(),
        serial_number,
        listed_date,
        status,
    })
}

fn parse_case_json(body: &str) -> Result<CaseRecord> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ScrapeError::ShapeChanged {
            context: format!("case-status response is not valid JSON: {}", e),
        })?;

    if is_empty_json(&value) {
        return Err(ScrapeError::EmptyResult);
    }

    serde_json::from_value(value).map_err(|e| ScrapeError::ShapeChanged {
        context: format!("case-status JSON missing expected fields: {}", e),
    })
}

fn parse_cause_list_html(body: &str, date: NaiveDate) -> Result<CauseList> {
    let document = Html::parse_document(body);
    let table_selector = Selector::parse(CAUSE_LIST_SELECTOR).unwrap();

    let Some(table) = document.select(&table_selector).next() else {
        if is_no_records_page(&document, body) {
            return Err(ScrapeError::EmptyResult);
        }
        return Err(ScrapeError::ShapeChanged {
            context: format!("cause-list page has no '{}' section", CAUSE_LIST_SELECTOR),
        });
    };

    let row_selector = Selector::parse("tr").unwrap();
    let header_selector = Selector::parse("th").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut entries = Vec::new();
    for row in table.select(&row_selector) {
        if row.select(&header_selector).next().is_some() {
            continue;
        }
        let cells: Vec<String> = row.select(&cell_selector).map(|c| cell_text(&c)).collect();
        if cells.is_empty() {
            continue;
        }

        // Cell order: serial, court, CNR, parties, purpose. Rows missing
        // the two leading cells cannot be attributed and are skipped.
        let serial_number = match cells.first().map(|s| s.parse::<u32>()) {
            Some(Ok(n)) => n,
            _ => {
                tracing::warn!(row = cells.join("|"), "cause-list row has no serial, skipping");
                continue;
            }
        };
        let Some(court_name) = cells.get(1).filter(|s| !s.is_empty()) else {
            tracing::warn!(serial = serial_number, "cause-list row has no court, skipping");
            continue;
        };

        entries.push(CauseListEntry {
            serial_number,
            court_name: court_name.clone(),
            case_reference: cells.get(2).filter(|s| !s.is_empty()).cloned(),
            party_names: cells.get(3).filter(|s| !s.is_empty()).cloned(),
            purpose: cells.get(4).filter(|s| !s.is_empty()).cloned(),
        });
    }

    Ok(CauseList {
        date,
        court: None,
        entries,
    })
}

fn parse_cause_list_json(body: &str, date: NaiveDate) -> Result<CauseList> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ScrapeError::ShapeChanged {
            context: format!("cause-list response is not valid JSON: {}", e),
        })?;

    if is_empty_json(&value) {
        return Err(ScrapeError::EmptyResult);
    }

    let mut list: CauseList =
        serde_json::from_value(value).map_err(|e| ScrapeError::ShapeChanged {
            context: format!("cause-list JSON missing expected fields: {}", e),
        })?;
    if list.date != date {
        tracing::debug!(
            requested = %date,
            returned = %list.date,
            "portal returned cause list for a different date"
        );
        list.date = date;
    }
    Ok(list)
}

fn is_no_records_page(document: &Html, body: &str) -> bool {
    let no_records = Selector::parse(NO_RECORDS_SELECTOR).unwrap();
    document.select(&no_records).next().is_some()
        || body.to_lowercase().contains(NO_RECORDS_TEXT)
}

fn is_empty_json(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Collapse runs of whitespace; the portal's markup is full of stray
/// newlines and non-breaking spaces.
fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn parse_portal_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn parse_status(raw: &str) -> CaseStatus {
    let lowered = raw.to_lowercase();
    if lowered.contains("dispos") {
        CaseStatus::Disposed
    } else if lowered.contains("not listed") {
        CaseStatus::NotListed
    } else if lowered.contains("listed") {
        CaseStatus::Listed
    } else {
        CaseStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html(body: &str) -> RawResponse {
        RawResponse {
            body: body.to_string(),
            kind: ResponseKind::Html,
            attempts: 1,
        }
    }

    fn json(body: &str) -> RawResponse {
        RawResponse {
            body: body.to_string(),
            kind: ResponseKind::Json,
            attempts: 1,
        }
    }

    const CASE_PAGE: &str = r#"
        <html><body>
        <table class="case-details">
            <tr><th>CNR</th><td>MHABC1000123452023</td></tr>
            <tr><th>Court Name</th><td>District Court Mumbai</td></tr>
            <tr><th>Serial Number</th><td>23</td></tr>
            <tr><th>Listed On</th><td>2025-10-08</td></tr>
            <tr><th>Status</th><td>Listed</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_parse_case_page() {
        let record = parse_case(&html(CASE_PAGE)).unwrap();
        assert_eq!(record.cnr, "MHABC1000123452023");
        assert_eq!(record.court_name, "District Court Mumbai");
        assert_eq!(record.serial_number, Some(23));
        assert_eq!(
            record.listed_date,
            NaiveDate::from_ymd_opt(2025, 10, 8)
        );
        assert_eq!(record.status, CaseStatus::Listed);
    }

    #[test]
    fn test_parse_case_tolerates_reordered_rows() {
        let page = r#"
            <table class="case-details">
                <tr><th>Status</th><td>Listed</td></tr>
                <tr><th>Serial Number</th><td>23</td></tr>
                <tr><th>CNR</th><td>MHABC1000123452023</td></tr>
                <tr><th>Court Name</th><td>District Court Mumbai</td></tr>
            </table>"#;
        let record = parse_case(&html(page)).unwrap();
        assert_eq!(record.cnr, "MHABC1000123452023");
        assert_eq!(record.serial_number, Some(23));
    }

    #[test]
    fn test_parse_case_defaults_missing_optional_fields() {
        let page = r#"
            <table class="case-details">
                <tr><th>CNR</th><td>MHABC1000123452023</td></tr>
                <tr><th>Court Name</th><td>District Court Mumbai</td></tr>
            </table>"#;
        let record = parse_case(&html(page)).unwrap();
        assert_eq!(record.serial_number, None);
        assert_eq!(record.listed_date, None);
        assert_eq!(record.status, CaseStatus::Unknown);
    }

    #[test]
    fn test_parse_case_tolerates_messy_whitespace_and_date_format() {
        let page = "
            <table class=\"case-details\">
                <tr><th> CNR </th><td>\n  MHABC1000123452023 </td></tr>
                <tr><th>Court  Name</th><td>District Court\n   Mumbai</td></tr>
                <tr><th>Listed On</th><td>08-10-2025</td></tr>
            </table>";
        let record = parse_case(&html(page)).unwrap();
        assert_eq!(record.cnr, "MHABC1000123452023");
        assert_eq!(record.court_name, "District Court Mumbai");
        assert_eq!(
            record.listed_date,
            NaiveDate::from_ymd_opt(2025, 10, 8)
        );
    }

    #[test]
    fn test_missing_section_is_shape_changed_not_crash() {
        let page = "<html><body><div>maintenance page</div></body></html>";
        let err = parse_case(&html(page)).unwrap_err();
        assert!(matches!(err, ScrapeError::ShapeChanged { .. }));
    }

    #[test]
    fn test_missing_cnr_row_is_shape_changed() {
        let page = r#"
            <table class="case-details">
                <tr><th>Court Name</th><td>District Court Mumbai</td></tr>
            </table>"#;
        let err = parse_case(&html(page)).unwrap_err();
        assert!(matches!(err, ScrapeError::ShapeChanged { .. }));
    }

    #[test]
    fn test_no_records_page_is_empty_result() {
        let page = r#"<html><body><div class="no-records">Record Not Found</div></body></html>"#;
        let err = parse_case(&html(page)).unwrap_err();
        assert!(matches!(err, ScrapeError::EmptyResult));
    }

    #[test]
    fn test_parse_case_json_with_portal_field_names() {
        let body = r#"{
            "CNR": "MHABC1000123452023",
            "CourtName": "District Court Mumbai",
            "SerialNumber": 23,
            "ListedOn": "2025-10-08"
        }"#;
        let record = parse_case(&json(body)).unwrap();
        assert_eq!(record.cnr, "MHABC1000123452023");
        assert_eq!(record.serial_number, Some(23));
    }

    #[test]
    fn test_empty_json_is_empty_result() {
        assert!(matches!(
            parse_case(&json("null")).unwrap_err(),
            ScrapeError::EmptyResult
        ));
        assert!(matches!(
            parse_case(&json("{}")).unwrap_err(),
            ScrapeError::EmptyResult
        ));
    }

    #[test]
    fn test_json_missing_required_fields_is_shape_changed() {
        let err = parse_case(&json(r#"{"somethingElse": true}"#)).unwrap_err();
        assert!(matches!(err, ScrapeError::ShapeChanged { .. }));
    }

    const CAUSE_LIST_PAGE: &str = r#"
        <table class="cause-list">
            <tr><th>Sr No</th><th>Court</th><th>CNR</th><th>Parties</th><th>Purpose</th></tr>
            <tr><td>1</td><td>High Court Delhi</td><td>DLHC010001232024</td>
                <td>State vs Sharma</td><td>Hearing</td></tr>
            <tr><td>2</td><td>District Court Pune</td><td></td><td></td><td></td></tr>
        </table>"#;

    #[test]
    fn test_parse_cause_list() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        let list = parse_cause_list(&html(CAUSE_LIST_PAGE), date).unwrap();
        assert_eq!(list.date, date);
        assert_eq!(list.entries.len(), 2);
        assert_eq!(list.entries[0].serial_number, 1);
        assert_eq!(list.entries[0].court_name, "High Court Delhi");
        assert_eq!(
            list.entries[0].case_reference.as_deref(),
            Some("DLHC010001232024")
        );
        assert_eq!(list.entries[1].case_reference, None);
    }

    #[test]
    fn test_cause_list_skips_malformed_rows() {
        let page = r#"
            <table class="cause-list">
                <tr><td>not-a-number</td><td>High Court Delhi</td></tr>
                <tr><td>2</td><td>District Court Pune</td></tr>
                <tr><td>3</td><td></td></tr>
            </table>"#;
        let date = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        let list = parse_cause_list(&html(page), date).unwrap();
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].serial_number, 2);
    }

    #[test]
    fn test_cause_list_empty_table_is_valid() {
        let page = r#"<table class="cause-list">
            <tr><th>Sr No</th><th>Court</th></tr></table>"#;
        let date = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        let list = parse_cause_list(&html(page), date).unwrap();
        assert!(list.entries.is_empty());
    }

    #[test]
    fn test_cause_list_missing_table_is_shape_changed() {
        let err = parse_cause_list(
            &html("<html><body>nothing here</body></html>"),
            NaiveDate::from_ymd_opt(2025, 10, 8).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, ScrapeError::ShapeChanged { .. }));
    }

    #[test]
    fn test_cause_list_json_with_cases_alias() {
        let body = r#"{
            "date": "2025-10-08",
            "cases": [
                {"SerialNumber": 1, "CourtName": "High Court Delhi"},
                {"SerialNumber": 2, "CourtName": "District Court Pune"}
            ]
        }"#;
        let date = NaiveDate::from_ymd_opt(2025, 10, 8).unwrap();
        let list = parse_cause_list(&json(body), date).unwrap();
        assert_eq!(list.entries.len(), 2);
    }
}
