use super::{direct_child, Change, ChangeStream, Store};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

struct Watcher {
    prefix: String,
    tx: UnboundedSender<Change>,
}

#[derive(Default)]
struct Inner {
    data: BTreeMap<String, Value>,
    watchers: Vec<Watcher>,
}

impl Inner {
    fn notify(&mut self, key: &str, value: Option<&Value>) {
        self.watchers.retain(|w| !w.tx.is_closed());
        for w in self.watchers.iter().filter(|w| key.starts_with(&w.prefix)) {
            let _ = w.tx.send(Change { key: key.to_string(), value: value.cloned() });
        }
    }
}

/// Process-local store. Every operation runs under one mutex, so single-key
/// operations are trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.inner.lock().data.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.inner.lock().data.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.notify(key, Some(&value));
        inner.data.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<Option<Value>> {
        let mut inner = self.inner.lock();
        let prev = inner.data.remove(key);
        if prev.is_some() {
            inner.notify(key, None);
        }
        Ok(prev)
    }

    async fn children(&self, parent: &str) -> Result<Vec<(String, Value)>> {
        let lower = format!("{parent}/");
        let inner = self.inner.lock();
        let out = inner
            .data
            .range(lower.clone()..)
            .take_while(|(k, _)| k.starts_with(&lower))
            .filter_map(|(k, v)| direct_child(parent, k).map(|c| (c.to_string(), v.clone())))
            .collect();
        Ok(out)
    }

    async fn on_change(&self, prefix: &str) -> Result<ChangeStream> {
        let (tx, rx) = unbounded_channel();
        self.inner.lock().watchers.push(Watcher { prefix: prefix.to_string(), tx });
        Ok(rx)
    }

    async fn insert_if_absent(&self, key: &str, value: Value) -> Result<bool> {
        let mut inner = self.inner.lock();
        if inner.data.contains_key(key) {
            return Ok(false);
        }
        inner.notify(key, Some(&value));
        inner.data.insert(key.to_string(), value);
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> Result<std::result::Result<(), Option<Value>>> {
        let mut inner = self.inner.lock();
        let current = inner.data.get(key).cloned();
        if current != expected {
            return Ok(Err(current));
        }
        inner.notify(key, new.as_ref());
        match new {
            Some(v) => inner.data.insert(key.to_string(), v),
            None => inner.data.remove(key),
        };
        Ok(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn children_are_direct_only() {
        let s = MemoryStore::new();
        s.put("ns/media/1", json!({"id": "1"})).await.unwrap();
        s.put("ns/media/1/likes", json!(0)).await.unwrap();
        s.put("ns/media/1/likers/u1", json!(true)).await.unwrap();
        s.put("ns/media/10", json!({"id": "10"})).await.unwrap();
        let kids: Vec<String> = s.children("ns/media").await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(kids, vec!["1", "10"]);
        let kids: Vec<String> = s.children("ns/media/1").await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(kids, vec!["likes"]);
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_existing() {
        let s = MemoryStore::new();
        assert!(s.insert_if_absent("k", json!(5)).await.unwrap());
        assert!(!s.insert_if_absent("k", json!(0)).await.unwrap());
        assert_eq!(s.get("k").await.unwrap(), Some(json!(5)));
    }

    #[tokio::test]
    async fn cas_reports_current_on_mismatch() {
        let s = MemoryStore::new();
        s.put("k", json!(2)).await.unwrap();
        let res = s.compare_and_swap("k", Some(json!(1)), Some(json!(3))).await.unwrap();
        assert_eq!(res, Err(Some(json!(2))));
        let res = s.compare_and_swap("k", Some(json!(2)), None).await.unwrap();
        assert_eq!(res, Ok(()));
        assert!(s.is_empty());
    }

    #[tokio::test]
    async fn watchers_see_later_writes() {
        let s = MemoryStore::new();
        let mut rx = s.on_change("ns/index/forest/").await.unwrap();
        s.put("ns/index/forest/7", json!(true)).await.unwrap();
        s.put("ns/index/lake/8", json!(true)).await.unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "ns/index/forest/7");
        assert!(rx.try_recv().is_err());
    }
}
