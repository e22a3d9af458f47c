use crate::catalog::CatalogWriter;
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::model::{MediaKind, MediaRecord, RawHit};
use crate::normalize::normalize;
use crate::store::StoreHandle;

/// Provider hits → normalized records → catalog + index.
#[derive(Clone)]
pub struct Ingestor {
    catalog: CatalogWriter,
    index: InvertedIndex,
}

impl Ingestor {
    pub fn new(handle: StoreHandle) -> Self {
        Self { catalog: CatalogWriter::new(handle.clone()), index: InvertedIndex::new(handle) }
    }

    /// Persists every hit and indexes it under `term`. Hits the normalizer rejects are
    /// skipped; store failures abort the batch.
    pub async fn ingest(&self, hits: &[RawHit], kind: MediaKind, term: &str, now_ms: i64) -> Result<Vec<MediaRecord>> {
        let mut stored = Vec::with_capacity(hits.len());
        for hit in hits {
            let record = match normalize(hit, kind, now_ms) {
                Ok(record) => record,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping provider hit");
                    continue;
                }
            };
            let record = self.catalog.put(record).await?;
            self.index.index(term, &record.id).await?;
            stored.push(record);
        }
        tracing::info!(term, kind = %kind, ingested = stored.len(), skipped = hits.len() - stored.len(), "ingested hits");
        Ok(stored)
    }
}
