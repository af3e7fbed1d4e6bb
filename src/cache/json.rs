use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::cache::CacheStore;
use crate::models::CacheState;

/// File-backed store holding the cache document as JSON.
pub struct JsonCacheStore {
    file_path: PathBuf,
}

impl JsonCacheStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.file_path
    }
}

#[async_trait]
impl CacheStore for JsonCacheStore {
    /// A corrupted file is moved aside to `<name>.bak` and treated as empty.
    async fn read(&self) -> Result<Option<CacheState>> {
        if !tokio::fs::try_exists(&self.file_path).await.unwrap_or(false) {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.file_path)
            .await
            .context("Failed to read cache file")?;
        match serde_json::from_str::<CacheState>(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(
                    "cache file {} is corrupted ({}), creating backup and starting empty",
                    self.file_path.display(),
                    e
                );
                let backup_path = self.file_path.with_extension("json.bak");
                if let Err(backup_err) = tokio::fs::rename(&self.file_path, &backup_path).await {
                    tracing::error!("Failed to back up corrupted cache file: {}", backup_err);
                }
                Ok(None)
            }
        }
    }

    /// Writes go to a `.tmp` sibling first and are renamed into place.
    async fn write(&self, state: Option<&CacheState>) -> Result<()> {
        let Some(state) = state else {
            if tokio::fs::try_exists(&self.file_path).await.unwrap_or(false) {
                tokio::fs::remove_file(&self.file_path)
                    .await
                    .context("Failed to remove cache file")?;
            }
            return Ok(());
        };

        if let Some(parent) = self.file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create cache directory")?;
        }

        let tmp_path = self.file_path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state).context("Failed to serialize cache")?;

        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .context("Failed to write temporary cache file")?;
        tokio::fs::rename(&tmp_path, &self.file_path)
            .await
            .context("Failed to rename temporary cache file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MaskingCache;
    use crate::models::Snapshot;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup_store() -> (JsonCacheStore, TempDir) {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let store = JsonCacheStore::new(tmp_dir.path().join("nested").join("cache.json"));
        (store, tmp_dir)
    }

    #[tokio::test]
    async fn test_missing_file_reads_none() {
        let (store, _tmp) = setup_store();
        assert!(store.read().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs_and_reads_back() {
        let (store, _tmp) = setup_store();
        let state = CacheState {
            last_input: Some("Yamada-san".to_string()),
            last_result: None,
        };
        store.write(Some(&state)).await.expect("write");
        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
        assert_eq!(store.read().await.expect("read"), Some(state));
    }

    #[tokio::test]
    async fn test_write_none_removes_file() {
        let (store, _tmp) = setup_store();
        let state = CacheState {
            last_input: Some("x".to_string()),
            last_result: None,
        };
        store.write(Some(&state)).await.expect("write");
        store.write(None).await.expect("write none");
        assert!(!store.path().exists());
        assert!(store.read().await.expect("read").is_none());

        // Removing an absent file is fine too.
        store.write(None).await.expect("write none again");
    }

    #[tokio::test]
    async fn test_corrupted_file_backed_up() {
        let (store, _tmp) = setup_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).expect("mkdir");
        std::fs::write(store.path(), "{{{ not json").expect("write garbage");

        assert!(store.read().await.expect("read").is_none());
        let backup = store.path().with_extension("json.bak");
        assert!(backup.exists());
        assert_eq!(
            std::fs::read_to_string(backup).expect("read backup"),
            "{{{ not json"
        );
    }

    #[tokio::test]
    async fn test_cache_round_trip_through_file() {
        let (store, _tmp) = setup_store();
        let path = store.path().clone();
        let snap = Snapshot {
            input_text: "Kimura visited Osaka".to_string(),
            masked_text: "■■■ visited Osaka".to_string(),
            model: "gpt-4o-mini".to_string(),
            endpoint: "localhost".to_string(),
            finished_at: Utc::now(),
        };

        MaskingCache::new(Arc::new(store))
            .remember_result(&snap)
            .await
            .expect("remember");

        let reopened = MaskingCache::new(Arc::new(JsonCacheStore::new(path.clone())));
        assert_eq!(reopened.last_result().await.expect("get"), Some(snap));
        assert_eq!(
            reopened.last_input().await.expect("get").as_deref(),
            Some("Kimura visited Osaka")
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(raw["lastResult"]["maskedText"], "■■■ visited Osaka");
    }
}
