use super::{direct_child, Change, ChangeStream, Store};
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tokio::sync::mpsc::unbounded_channel;

/// Store backed by an embedded sled tree. Values are JSON-encoded.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Throwaway tree removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

fn encode(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode(bytes: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

fn decode_key(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| CatalogError::Store(format!("non-utf8 key: {e}")))
}

#[async_trait]
impl Store for SledStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.db.get(key)?.map(|v| decode(&v)).transpose()
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.db.insert(key, encode(&value)?)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<Option<Value>> {
        self.db.remove(key)?.map(|v| decode(&v)).transpose()
    }

    async fn children(&self, parent: &str) -> Result<Vec<(String, Value)>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(format!("{parent}/")) {
            let (k, v) = item?;
            let key = decode_key(&k)?;
            if let Some(child) = direct_child(parent, &key) {
                out.push((child.to_string(), decode(&v)?));
            }
        }
        Ok(out)
    }

    /// Each subscription is one lightweight task awaiting sled's subscriber future. It
    /// ends as soon as the returned stream is dropped and holds no blocking thread.
    async fn on_change(&self, prefix: &str) -> Result<ChangeStream> {
        let (tx, rx) = unbounded_channel();
        let mut subscriber = self.db.watch_prefix(prefix);
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = tx.closed() => break,
                    event = &mut subscriber => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                let change = match event {
                    sled::Event::Insert { key, value } => {
                        let (Ok(key), Ok(value)) = (decode_key(&key), decode(&value)) else { continue };
                        Change { key, value: Some(value) }
                    }
                    sled::Event::Remove { key } => {
                        let Ok(key) = decode_key(&key) else { continue };
                        Change { key, value: None }
                    }
                };
                if tx.send(change).is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn insert_if_absent(&self, key: &str, value: Value) -> Result<bool> {
        let swapped = self.db.compare_and_swap(key, None as Option<&[u8]>, Some(encode(&value)?))?;
        Ok(swapped.is_ok())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<Value>,
        new: Option<Value>,
    ) -> Result<std::result::Result<(), Option<Value>>> {
        let expected = expected.as_ref().map(encode).transpose()?;
        let new = new.as_ref().map(encode).transpose()?;
        match self.db.compare_and_swap(key, expected.as_deref(), new)? {
            Ok(()) => Ok(Ok(())),
            Err(conflict) => Ok(Err(conflict.current.map(|v| decode(&v)).transpose()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn sled_primitives() {
        let s = SledStore::temporary().unwrap();
        assert!(s.insert_if_absent("ns/media/1/likes", json!(0)).await.unwrap());
        assert!(!s.insert_if_absent("ns/media/1/likes", json!(9)).await.unwrap());
        let res = s.compare_and_swap("ns/media/1/likes", Some(json!(0)), Some(json!(1))).await.unwrap();
        assert!(res.is_ok());
        let res = s.compare_and_swap("ns/media/1/likes", Some(json!(0)), Some(json!(2))).await.unwrap();
        assert_eq!(res, Err(Some(json!(1))));
        s.put("ns/media/1", json!({"id": "1"})).await.unwrap();
        let kids = s.children("ns/media/1").await.unwrap();
        assert_eq!(kids, vec![("likes".to_string(), json!(1))]);
    }

    #[tokio::test]
    async fn sled_watch_prefix() {
        let s = SledStore::temporary().unwrap();
        let mut rx = s.on_change("ns/index/forest/").await.unwrap();
        s.put("ns/index/forest/3", json!(true)).await.unwrap();
        let change = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(change, Change { key: "ns/index/forest/3".into(), value: Some(json!(true)) });
    }

    #[test]
    fn subscriptions_do_not_hold_blocking_threads() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let s = SledStore::temporary().unwrap();
            let mut streams = Vec::new();
            for _ in 0..8 {
                streams.push(s.on_change("ns/index/forest/").await.unwrap());
            }
            s.put("ns/index/forest/1", json!(true)).await.unwrap();
            for rx in &mut streams {
                let change = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
                assert_eq!(change.key, "ns/index/forest/1");
            }
        });
    }
}
