use media_core::normalize::normalize;
use media_core::{CatalogWriter, InvertedIndex, MediaKind, PruneReport, RawHit, StoreHandle};

async fn seed(handle: &StoreHandle, ids: &[&str], orphans: &[&str]) -> InvertedIndex {
    let writer = CatalogWriter::new(handle.clone());
    let index = InvertedIndex::new(handle.clone());
    for id in ids {
        let hit: RawHit = serde_json::from_value(serde_json::json!({ "id": id })).unwrap();
        writer.put(normalize(&hit, MediaKind::Image, 0).unwrap()).await.unwrap();
        index.index("forest", id).await.unwrap();
    }
    for id in orphans {
        index.index("forest", id).await.unwrap();
    }
    index
}

#[tokio::test]
async fn indexing_twice_keeps_cardinality() {
    let handle = StoreHandle::memory("catalog");
    let index = seed(&handle, &["1", "2"], &[]).await;
    let before = index.ids("forest").await.unwrap().len();
    index.index("forest", "1").await.unwrap();
    index.index("forest", "2").await.unwrap();
    assert_eq!(index.ids("forest").await.unwrap().len(), before);
}

#[tokio::test]
async fn prune_drops_orphans_then_caps() {
    let handle = StoreHandle::memory("catalog");
    let index = seed(&handle, &["1", "2", "3"], &["x", "y"]).await;
    let report = index.prune("forest", 2).await.unwrap();
    assert_eq!(report, PruneReport { orphans_removed: 2, overflow_removed: 1, remaining: 2 });
    assert_eq!(index.ids("forest").await.unwrap(), vec!["1", "2"]);
}

#[tokio::test]
async fn prune_without_overflow_keeps_everything_live() {
    let handle = StoreHandle::memory("catalog");
    let index = seed(&handle, &["1", "2"], &[]).await;
    let report = index.prune("forest", 10).await.unwrap();
    assert_eq!(report.remaining, 2);
    assert_eq!(report.overflow_removed, 0);
}
