use crate::error::Result;
use crate::keys::check_segment;
use crate::store::{fetch_update, StoreHandle};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

pub const ALREADY_LIKED: &str = "already liked";
pub const NOT_LIKED_YET: &str = "not liked yet";

/// Result of a like/unlike. `likes` is only reported when the counter moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl LikeOutcome {
    fn changed(liked: bool, likes: u64) -> Self {
        Self { liked, likes: Some(likes), message: None }
    }

    fn unchanged(liked: bool, message: &'static str) -> Self {
        Self { liked, likes: None, message: Some(message) }
    }
}

/// Per-id async locks. A slot lives only while someone holds or waits on it.
#[derive(Clone, Default)]
struct IdLocks {
    slots: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

struct IdGuard {
    slots: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl IdLocks {
    async fn lock(&self, id: &str) -> IdGuard {
        let slot = self.slots.lock().entry(id.to_string()).or_default().clone();
        let guard = slot.lock_owned().await;
        IdGuard { slots: self.slots.clone(), id: id.to_string(), guard: Some(guard) }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Drop for IdGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        self.guard.take();
        if slots.get(&self.id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(&self.id);
        }
    }
}

/// Per-user deduplicated likes and plain download counting.
///
/// Membership is claimed with an atomic insert-if-absent on `likers/{uid}` and the
/// counters move through compare-and-swap, so two racing likes from one user count once.
/// Every mutation of one id holds that id's lock across the membership change and the
/// counter update, so `likes` matches the likers set once writers are quiet. The lock is
/// process-local: services sharing one store must share one `CounterService`.
#[derive(Clone)]
pub struct CounterService {
    handle: StoreHandle,
    locks: IdLocks,
}

impl CounterService {
    pub fn new(handle: StoreHandle) -> Self {
        Self { handle, locks: IdLocks::default() }
    }

    pub async fn like(&self, id: &str, uid: &str) -> Result<LikeOutcome> {
        check_segment("id", id)?;
        check_segment("uid", uid)?;
        let store = self.handle.store.as_ref();
        let keys = &self.handle.keys;
        let _guard = self.locks.lock(id).await;

        if !store.insert_if_absent(&keys.liker(id, uid), json!(true)).await? {
            return Ok(LikeOutcome::unchanged(true, ALREADY_LIKED));
        }
        let next = fetch_update(store, &keys.likes(id), |cur| json!(count(cur) + 1)).await?;
        let likes = count(Some(&next));
        tracing::debug!(id, uid, likes, "liked");
        Ok(LikeOutcome::changed(true, likes))
    }

    pub async fn unlike(&self, id: &str, uid: &str) -> Result<LikeOutcome> {
        check_segment("id", id)?;
        check_segment("uid", uid)?;
        let store = self.handle.store.as_ref();
        let keys = &self.handle.keys;
        let _guard = self.locks.lock(id).await;

        if store.remove(&keys.liker(id, uid)).await?.is_none() {
            return Ok(LikeOutcome::unchanged(false, NOT_LIKED_YET));
        }
        let next = fetch_update(store, &keys.likes(id), |cur| json!(count(cur).saturating_sub(1))).await?;
        let likes = count(Some(&next));
        tracing::debug!(id, uid, likes, "unliked");
        Ok(LikeOutcome::changed(false, likes))
    }

    /// Unconditional increment, not deduplicated by user.
    pub async fn download(&self, id: &str) -> Result<u64> {
        check_segment("id", id)?;
        let store = self.handle.store.as_ref();
        let _guard = self.locks.lock(id).await;
        let next = fetch_update(store, &self.handle.keys.downloads(id), |cur| json!(count(cur) + 1)).await?;
        Ok(count(Some(&next)))
    }

    /// Number of users currently holding a like on `id`.
    pub async fn likers(&self, id: &str) -> Result<usize> {
        check_segment("id", id)?;
        Ok(self.handle.store.children(&self.handle.keys.likers(id)).await?.len())
    }
}

fn count(value: Option<&Value>) -> u64 {
    value.and_then(Value::as_u64).unwrap_or(0)
}
