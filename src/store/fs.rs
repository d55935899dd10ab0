//! File-per-record store: `<root>/<collection>/<id>.json`.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{Collection, RecordStore};
use crate::domain::check_id::is_path_safe;
use crate::error::MonitorError;

const RECORD_SUFFIX: &str = ".json";

/// Record store keeping one JSON file per record.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    /// Creates a store rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    fn record_path(&self, collection: Collection, id: &str) -> Result<PathBuf, MonitorError> {
        if !is_path_safe(id) {
            return Err(MonitorError::InvalidRequest(format!(
                "`{id}` is not a valid record id"
            )));
        }
        Ok(self
            .collection_dir(collection)
            .join(format!("{id}{RECORD_SUFFIX}")))
    }
}

fn map_missing(err: std::io::Error, collection: Collection, id: &str) -> MonitorError {
    if err.kind() == ErrorKind::NotFound {
        MonitorError::not_found(collection.as_str(), id)
    } else {
        MonitorError::Io(err)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn create(
        &self,
        collection: Collection,
        id: &str,
        record: &Value,
    ) -> Result<(), MonitorError> {
        let path = self.record_path(collection, id)?;
        let body = serde_json::to_vec(record)?;
        fs::create_dir_all(self.collection_dir(collection)).await?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    MonitorError::RecordExists {
                        collection: collection.as_str().to_string(),
                        id: id.to_string(),
                    }
                } else {
                    MonitorError::Io(e)
                }
            })?;
        file.write_all(&body).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read(&self, collection: Collection, id: &str) -> Result<Value, MonitorError> {
        let path = self.record_path(collection, id)?;
        let raw = fs::read(&path)
            .await
            .map_err(|e| map_missing(e, collection, id))?;
        // Corrupt files read as an empty object; the validator rejects them.
        Ok(serde_json::from_slice(&raw).unwrap_or_else(|e| {
            tracing::warn!(%collection, id, error = %e, "unparseable record");
            Value::Object(serde_json::Map::new())
        }))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: &Value,
    ) -> Result<(), MonitorError> {
        let path = self.record_path(collection, id)?;
        let body = serde_json::to_vec(record)?;
        fs::metadata(&path)
            .await
            .map_err(|e| map_missing(e, collection, id))?;

        // Write-then-rename so readers never observe a half-written record.
        let staging = path.with_extension("json.tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .await?;
        file.write_all(&body).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), MonitorError> {
        let path = self.record_path(collection, id)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| map_missing(e, collection, id))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<String>, MonitorError> {
        let mut dir = match fs::read_dir(self.collection_dir(collection)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(RECORD_SUFFIX))
            {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, FileRecordStore) {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let store = FileRecordStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn create_read_update_delete() {
        let (_dir, store) = store();
        let record = json!({"id": "one", "state": "down"});
        tokio_test::assert_ok!(store.create(Collection::Checks, "one", &record).await);

        let Ok(read) = store.read(Collection::Checks, "one").await else {
            panic!("read failed");
        };
        assert_eq!(read, record);

        let updated = json!({"id": "one", "state": "up"});
        tokio_test::assert_ok!(store.update(Collection::Checks, "one", &updated).await);
        let Ok(read) = store.read(Collection::Checks, "one").await else {
            panic!("read failed");
        };
        assert_eq!(read, updated);

        tokio_test::assert_ok!(store.delete(Collection::Checks, "one").await);
        assert!(matches!(
            store.read(Collection::Checks, "one").await,
            Err(MonitorError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_shorter_body_truncates() {
        let (_dir, store) = store();
        let long = json!({"padding": "x".repeat(200)});
        tokio_test::assert_ok!(store.create(Collection::Users, "u", &long).await);
        tokio_test::assert_ok!(store.update(Collection::Users, "u", &json!({})).await);
        let Ok(read) = store.read(Collection::Users, "u").await else {
            panic!("read failed");
        };
        assert_eq!(read, json!({}));
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let (_dir, store) = store();
        tokio_test::assert_ok!(store.create(Collection::Checks, "x", &json!({})).await);
        assert!(matches!(
            store.create(Collection::Checks, "x", &json!({})).await,
            Err(MonitorError::RecordExists { .. })
        ));
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.update(Collection::Checks, "ghost", &json!({})).await,
            Err(MonitorError::RecordNotFound { .. })
        ));
        assert!(matches!(
            store.delete(Collection::Checks, "ghost").await,
            Err(MonitorError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_is_sorted_and_scoped() {
        let (_dir, store) = store();
        assert_eq!(
            store.list(Collection::Checks).await.unwrap_or_default(),
            Vec::<String>::new()
        );
        for id in ["b", "a", "c"] {
            tokio_test::assert_ok!(store.create(Collection::Checks, id, &json!({})).await);
        }
        tokio_test::assert_ok!(store.create(Collection::Users, "z", &json!({})).await);
        let Ok(ids) = store.list(Collection::Checks).await else {
            panic!("list failed");
        };
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_empty_object() {
        let (dir, store) = store();
        let checks = dir.path().join("checks");
        tokio_test::assert_ok!(tokio::fs::create_dir_all(&checks).await);
        tokio_test::assert_ok!(tokio::fs::write(checks.join("bad.json"), b"{not json").await);
        let Ok(read) = store.read(Collection::Checks, "bad").await else {
            panic!("read failed");
        };
        assert_eq!(read, json!({}));
    }

    #[tokio::test]
    async fn rejects_traversal_ids() {
        let (_dir, store) = store();
        assert!(matches!(
            store.read(Collection::Checks, "../secret").await,
            Err(MonitorError::InvalidRequest(_))
        ));
    }
}
