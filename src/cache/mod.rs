pub mod json;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{CacheState, Snapshot};

pub use json::JsonCacheStore;
pub use memory::InMemoryCacheStore;

/// Whole-document persistence for the cache. `write(None)` drops the stored
/// state entirely.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn read(&self) -> Result<Option<CacheState>>;
    async fn write(&self, state: Option<&CacheState>) -> Result<()>;
}

/// Remembers the last normalized input and the last successful result.
///
/// State is loaded from the store on first use and every mutation is written
/// straight back. A mutation only lands in memory once the store accepted it.
pub struct MaskingCache {
    store: Arc<dyn CacheStore>,
    state: Mutex<Option<CacheState>>,
}

impl MaskingCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            state: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCacheStore::default()))
    }

    pub async fn remember_input(&self, text: &str) -> Result<()> {
        let normalized = text.trim();
        if normalized.is_empty() {
            return Ok(());
        }
        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await?;
        let next = CacheState {
            last_input: Some(normalized.to_string()),
            ..state.clone()
        };
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    pub async fn remember_result(&self, snapshot: &Snapshot) -> Result<()> {
        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await?;
        let next = CacheState {
            last_input: Some(snapshot.input_text.clone()),
            last_result: Some(snapshot.clone()),
        };
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    pub async fn last_input(&self) -> Result<Option<String>> {
        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await?;
        Ok(state.last_input.clone())
    }

    pub async fn last_result(&self) -> Result<Option<Snapshot>> {
        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await?;
        Ok(state.last_result.clone())
    }

    pub async fn clear(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        self.persist(&CacheState::default()).await?;
        *guard = Some(CacheState::default());
        Ok(())
    }

    async fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<CacheState>,
    ) -> Result<&'a mut CacheState> {
        if slot.is_none() {
            let stored = self.store.read().await?;
            tracing::debug!("masking cache loaded (present: {})", stored.is_some());
            *slot = Some(stored.unwrap_or_default());
        }
        Ok(slot.get_or_insert_with(CacheState::default))
    }

    async fn persist(&self, state: &CacheState) -> Result<()> {
        let stored = if state.is_empty() { None } else { Some(state) };
        let result = self.store.write(stored).await;
        if let Err(ref e) = result {
            tracing::error!("Failed to persist masking cache: {:#}", e);
        }
        result
    }
}
