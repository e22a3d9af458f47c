use crate::catalog::CatalogWriter;
use crate::error::{CatalogError, Result};
use crate::index::present;
use crate::model::MediaRecord;
use crate::store::{direct_child, Change, StoreHandle};
use crate::tokenizer::normalize_term;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Default collection window. Long enough for local and in-flight replicated index
/// writes to land; it is a latency/staleness tradeoff, not a correctness bound.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(250);

const RESOLVE_CONCURRENCY: usize = 16;

/// Collects the ids indexed under a term for a bounded window and resolves them to records.
#[derive(Clone)]
pub struct FanInAggregator {
    handle: StoreHandle,
    catalog: CatalogWriter,
    window: Duration,
}

impl FanInAggregator {
    pub fn new(handle: StoreHandle) -> Self {
        Self::with_window(handle, DEFAULT_WINDOW)
    }

    pub fn with_window(handle: StoreHandle, window: Duration) -> Self {
        let catalog = CatalogWriter::new(handle.clone());
        Self { handle, catalog, window }
    }

    /// Up to `limit` records indexed under `term`.
    ///
    /// Ids already present plus those arriving before the window closes are resolved
    /// concurrently; index entries without a record are dropped. Result order follows
    /// resolution order and carries no meaning. Firing `cancel` aborts with
    /// [`CatalogError::Cancelled`].
    pub async fn list_by_term(
        &self,
        term: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaRecord>> {
        let term = normalize_term(term);
        // nothing is ever indexed under an empty term
        if term.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let ids = self.collect(&term, cancel).await?;
        tracing::debug!(term = %term, ids = ids.len(), "index window closed");

        tokio::select! {
            _ = cancel.cancelled() => Err(CatalogError::Cancelled),
            records = self.resolve(ids, limit) => records,
        }
    }

    async fn collect(&self, term: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let store = self.handle.store.as_ref();
        let parent = self.handle.keys.index_term(term);
        let deadline = Instant::now() + self.window;

        // subscribe before enumerating so nothing falls between the two
        let mut changes = store.on_change(&format!("{parent}/")).await?;
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for (id, value) in store.children(&parent).await? {
            if present(&value) && seen.insert(id.clone()) {
                ids.push(id);
            }
        }

        let mut open = true;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
                _ = sleep_until(deadline) => break,
                change = changes.recv(), if open => match change {
                    Some(Change { key, value: Some(value) }) if present(&value) => {
                        if let Some(id) = direct_child(&parent, &key) {
                            if seen.insert(id.to_string()) {
                                ids.push(id.to_string());
                            }
                        }
                    }
                    Some(_) => {}
                    None => open = false,
                },
            }
        }
        Ok(ids)
    }

    async fn resolve(&self, ids: Vec<String>, limit: usize) -> Result<Vec<MediaRecord>> {
        let catalog = &self.catalog;
        let mut resolved = stream::iter(ids)
            .map(move |id| async move {
                let record = catalog.get(&id).await;
                (id, record)
            })
            .buffer_unordered(RESOLVE_CONCURRENCY);

        let mut out = Vec::new();
        while let Some((id, record)) = resolved.next().await {
            match record? {
                Some(record) => {
                    out.push(record);
                    if out.len() >= limit {
                        break;
                    }
                }
                None => tracing::debug!(id = %id, "index entry without record dropped"),
            }
        }
        Ok(out)
    }
}
