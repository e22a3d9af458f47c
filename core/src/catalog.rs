use crate::error::{CatalogError, Result};
use crate::keys::check_segment;
use crate::model::MediaRecord;
use crate::store::{read_count, StoreHandle};
use serde::Serialize;
use serde_json::json;

/// A record together with its counters, as served by the media lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub record: MediaRecord,
    pub likes: u64,
    pub downloads: u64,
}

/// Upserts records and owns the lazily-initialised counter sub-keys.
#[derive(Clone)]
pub struct CatalogWriter {
    handle: StoreHandle,
}

impl CatalogWriter {
    pub fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// Writes the record's descriptive fields, keeping `created_at` from any earlier
    /// version, then creates the counters if they do not exist yet. Existing counters
    /// are never touched.
    pub async fn put(&self, mut record: MediaRecord) -> Result<MediaRecord> {
        check_segment("id", &record.id)?;
        let store = self.handle.store.as_ref();
        let keys = &self.handle.keys;

        if let Some(existing) = self.get(&record.id).await? {
            record.created_at = existing.created_at;
        }
        store.put(&keys.media(&record.id), serde_json::to_value(&record)?).await?;

        let likes_created = store.insert_if_absent(&keys.likes(&record.id), json!(0)).await?;
        let downloads_created = store.insert_if_absent(&keys.downloads(&record.id), json!(0)).await?;
        tracing::debug!(id = %record.id, likes_created, downloads_created, "record stored");
        Ok(record)
    }

    /// An id that cannot name a key (empty or containing `/`) resolves to nothing.
    pub async fn get(&self, id: &str) -> Result<Option<MediaRecord>> {
        if check_segment("id", id).is_err() {
            return Ok(None);
        }
        let value = self.handle.store.get(&self.handle.keys.media(id)).await?;
        match value {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Record plus counters; absent counters read as zero.
    pub async fn get_with_counters(&self, id: &str) -> Result<CatalogEntry> {
        let record = self.get(id).await?.ok_or_else(|| CatalogError::NotFound("not found".into()))?;
        let store = self.handle.store.as_ref();
        let likes = read_count(store, &self.handle.keys.likes(id)).await?;
        let downloads = read_count(store, &self.handle.keys.downloads(id)).await?;
        Ok(CatalogEntry { record, likes, downloads })
    }
}
