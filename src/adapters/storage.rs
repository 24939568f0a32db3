use crate::domain::ports::Storage;
use crate::utils::error::{Result, ScrapeError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// Distinguishes temp names across concurrent writers in one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.base_path.join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    /// Write-to-temp then rename, so an interrupted or concurrent write
    /// never leaves a partial file at the target path.
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file_name = full_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ScrapeError::Store {
                message: format!("invalid target path: {}", full_path.display()),
            })?;
        let tmp_name = format!(
            ".{}.{}.{}.tmp",
            file_name,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let tmp_path = full_path.with_file_name(tmp_name);

        fs::write(&tmp_path, data)?;
        if let Err(e) = fs::rename(&tmp_path, &full_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("cache/key.json", b"{}").await.unwrap();
        let data = storage.read_file("cache/key.json").await.unwrap();
        assert_eq!(data, b"{}");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let err = storage.read_file("missing.json").await.unwrap_err();
        match err {
            ScrapeError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .write_file("nested/deeper/file.json", b"data")
            .await
            .unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path().join("nested/deeper"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["file.json"]);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("file.json", b"old").await.unwrap();
        storage.write_file("file.json", b"new").await.unwrap();
        assert_eq!(storage.read_file("file.json").await.unwrap(), b"new");
    }
}
