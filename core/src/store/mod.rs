//! Storage capability consumed by the catalog.
//!
//! The backing store is treated as an eventually-consistent key-value map: every
//! key converges on its own, there are no cross-key transactions and a write is
//! not guaranteed to be visible to the next read from another replica. The only
//! atomic operations the catalog relies on are single-key ones:
//! [`Store::insert_if_absent`] and [`Store::compare_and_swap`].
//!
//! Two backends ship with the crate:
//! - [`MemoryStore`]: process-local map, used by tests and ephemeral runs.
//! - [`SledStore`]: embedded sled tree on disk.

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::error::Result;
use crate::keys::Keyspace;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// A write observed under a watched prefix. `value` is `None` for removals.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key: String,
    pub value: Option<Value>,
}

/// Stream of changes; dropping it ends the subscription.
pub type ChangeStream = UnboundedReceiver<Change>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Last-writer-wins overwrite.
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Removes `key`, returning what was there.
    async fn remove(&self, key: &str) -> Result<Option<Value>>;

    /// Direct children of `parent` as `(child segment, value)`, in key order.
    async fn children(&self, parent: &str) -> Result<Vec<(String, Value)>>;

    /// Subscribes to writes under `prefix` issued after this call returns.
    async fn on_change(&self, prefix: &str) -> Result<ChangeStream>;

    /// Writes `value` only if `key` holds nothing. Returns whether the write happened.
    async fn insert_if_absent(&self, key: &str, value: Value) -> Result<bool>;

    /// Swaps `expected` for `new` atomically. On mismatch returns the current value.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> Result<std::result::Result<(), Option<Value>>>;
}

/// Explicit handle to the shared store and the namespace it is scoped to.
#[derive(Clone)]
pub struct StoreHandle {
    pub store: Arc<dyn Store>,
    pub keys: Keyspace,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn Store>, keys: Keyspace) -> Self {
        Self { store, keys }
    }

    /// In-memory store under `namespace`.
    pub fn memory(namespace: &str) -> Self {
        Self::new(Arc::new(MemoryStore::new()), Keyspace::new(namespace))
    }
}

/// Atomic read-modify-write built on compare-and-swap. Retries until no other writer
/// slipped in between the read and the swap; returns the value written.
pub async fn fetch_update<F>(store: &dyn Store, key: &str, mut f: F) -> Result<Value>
where
    F: FnMut(Option<&Value>) -> Value + Send,
{
    let mut current = store.get(key).await?;
    loop {
        let next = f(current.as_ref());
        match store.compare_and_swap(key, current.clone(), Some(next.clone())).await? {
            Ok(()) => return Ok(next),
            Err(actual) => {
                tracing::trace!(key, "compare-and-swap lost, retrying");
                current = actual;
            }
        }
    }
}

/// Reads a counter; absent or non-numeric values count as zero.
pub async fn read_count(store: &dyn Store, key: &str) -> Result<u64> {
    Ok(store.get(key).await?.and_then(|v| v.as_u64()).unwrap_or(0))
}

/// Child segment of `key` directly under `parent`, if there is exactly one level between them.
pub(crate) fn direct_child<'a>(parent: &str, key: &'a str) -> Option<&'a str> {
    let rest = key.strip_prefix(parent)?.strip_prefix('/')?;
    if rest.is_empty() || rest.contains('/') { None } else { Some(rest) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_child_only_one_level() {
        assert_eq!(direct_child("ns/index/forest", "ns/index/forest/1"), Some("1"));
        assert_eq!(direct_child("ns/media/1", "ns/media/1/likers/u1"), None);
        assert_eq!(direct_child("ns/index/fore", "ns/index/forest/1"), None);
    }
}
