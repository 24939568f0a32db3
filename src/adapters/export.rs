//! User-facing result files. Unlike cache envelopes these carry no
//! timestamps: identical remote data always reproduces identical bytes,
//! so re-running a download is a deterministic overwrite.

use crate::domain::model::{CaseRecord, CauseList};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, ScrapeError};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Persist a found case under its canonical query key.
pub async fn write_case_result<S: Storage>(
    storage: &S,
    key: &str,
    record: &CaseRecord,
) -> Result<String> {
    let path = format!("results_{}.json", key);
    storage.write_file(&path, &to_pretty_json(record)?).await?;
    Ok(path)
}

/// Persist a cause list as JSON plus a CSV rendering. Returns the paths
/// written, relative to the storage root.
pub async fn write_cause_list<S: Storage>(storage: &S, list: &CauseList) -> Result<Vec<String>> {
    let json_path = format!("cause_list_{}.json", list.date);
    storage
        .write_file(&json_path, &to_pretty_json(list)?)
        .await?;

    let csv_path = format!("cause_list_{}.csv", list.date);
    storage.write_file(&csv_path, &cause_list_csv(list)?).await?;

    Ok(vec![json_path, csv_path])
}

/// Zip the JSON and CSV renderings of a cause list into one archive.
pub async fn write_cause_list_bundle<S: Storage>(
    storage: &S,
    list: &CauseList,
) -> Result<String> {
    let zip_data = {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

        zip.start_file::<_, ()>(
            format!("cause_list_{}.json", list.date),
            FileOptions::default(),
        )?;
        zip.write_all(&to_pretty_json(list)?)?;

        zip.start_file::<_, ()>(
            format!("cause_list_{}.csv", list.date),
            FileOptions::default(),
        )?;
        zip.write_all(&cause_list_csv(list)?)?;

        let cursor = zip.finish()?;
        cursor.into_inner()
    };

    let path = format!("cause_list_{}_bundle.zip", list.date);
    storage.write_file(&path, &zip_data).await?;
    Ok(path)
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn cause_list_csv(list: &CauseList) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in &list.entries {
        writer.serialize(entry)?;
    }
    writer.into_inner().map_err(|e| ScrapeError::Store {
        message: format!("could not finish CSV export: {}", e),
    })
}
