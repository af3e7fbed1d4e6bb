use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::cache::CacheStore;
use crate::errors::MaskError;
use crate::models::CacheState;

/// Process-local store, used by default and in tests.
#[derive(Default)]
pub struct InMemoryCacheStore {
    state: Mutex<Option<CacheState>>,
}

impl InMemoryCacheStore {
    pub fn new(initial: Option<CacheState>) -> Self {
        Self {
            state: Mutex::new(initial),
        }
    }

    /// Current stored document, if any.
    pub fn snapshot(&self) -> Option<CacheState> {
        self.state.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn read(&self) -> Result<Option<CacheState>> {
        let guard = self
            .state
            .lock()
            .map_err(|_| MaskError::Storage("in-memory cache lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    async fn write(&self, state: Option<&CacheState>) -> Result<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| MaskError::Storage("in-memory cache lock poisoned".to_string()))?;
        *guard = state.cloned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_reads_none() {
        let store = InMemoryCacheStore::default();
        assert!(store.read().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let store = InMemoryCacheStore::default();
        let state = CacheState {
            last_input: Some("hello".to_string()),
            last_result: None,
        };
        store.write(Some(&state)).await.expect("write");
        assert_eq!(store.read().await.expect("read"), Some(state));

        store.write(None).await.expect("write none");
        assert!(store.read().await.expect("read").is_none());
        assert!(store.snapshot().is_none());
    }
}
