use crate::error::Result;
use crate::keys::check_segment;
use crate::store::StoreHandle;
use crate::tokenizer::normalize_term;
use serde::Serialize;
use serde_json::json;

/// Outcome of an explicit pruning pass over one term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub orphans_removed: usize,
    pub overflow_removed: usize,
    pub remaining: usize,
}

/// Insertion-only mapping from search term to record ids. Entries are only ever
/// removed by an explicit [`InvertedIndex::prune`].
#[derive(Clone)]
pub struct InvertedIndex {
    handle: StoreHandle,
}

impl InvertedIndex {
    pub fn new(handle: StoreHandle) -> Self {
        Self { handle }
    }

    /// Idempotent set-insert of `id` under `term`. Terms that normalize to nothing are skipped.
    pub async fn index(&self, term: &str, id: &str) -> Result<()> {
        check_segment("id", id)?;
        let term = normalize_term(term);
        if term.is_empty() {
            return Ok(());
        }
        self.handle.store.put(&self.handle.keys.index_entry(&term, id), json!(true)).await
    }

    /// Ids currently present under `term`.
    pub async fn ids(&self, term: &str) -> Result<Vec<String>> {
        let term = normalize_term(term);
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let children = self.handle.store.children(&self.handle.keys.index_term(&term)).await?;
        Ok(children.into_iter().filter(|(_, v)| present(v)).map(|(id, _)| id).collect())
    }

    /// Drops entries whose record no longer resolves, then keeps at most `max_entries`
    /// of the remaining ids (lowest keys kept).
    pub async fn prune(&self, term: &str, max_entries: usize) -> Result<PruneReport> {
        let term = normalize_term(term);
        let mut report = PruneReport::default();
        let store = self.handle.store.as_ref();
        let keys = &self.handle.keys;

        let mut live = Vec::new();
        for id in self.ids(&term).await? {
            if store.get(&keys.media(&id)).await?.is_some() {
                live.push(id);
            } else {
                store.remove(&keys.index_entry(&term, &id)).await?;
                report.orphans_removed += 1;
            }
        }
        for id in live.iter().skip(max_entries) {
            store.remove(&keys.index_entry(&term, id)).await?;
            report.overflow_removed += 1;
        }
        report.remaining = live.len().min(max_entries);
        tracing::info!(term = %term, ?report, "index term pruned");
        Ok(report)
    }
}

/// Index entries are presence markers; anything but `true` reads as absent.
pub(crate) fn present(value: &serde_json::Value) -> bool {
    value.as_bool().unwrap_or(false)
}
