use chrono::NaiveDate;
use std::sync::Arc;
use tempfile::tempdir;
use tracker_cache::mem::MemKvStore;
use tracker_cache::scoped::{CACHE_NAMESPACE, ScopedStore, WATCHLIST_NAMESPACE};
use tracker_core::kv::port::KvStore;
use tracker_core::watchlist::entity::{NewObservation, ReferenceSlot};
use tracker_core::watchlist::error::WatchlistError;
use tracker_core::watchlist::port::WatchlistStore;
use tracker_store::kv::SqliteKvStore;
use tracker_store::watchlist::{KvWatchlist, WATCHLIST_KEY};

fn draft(day: u32, raw_code: &str, name: &str) -> NewObservation {
    NewObservation {
        date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
        raw_code: raw_code.to_string(),
        name: name.to_string(),
        low: 10.5,
        high: 11.0,
        notes: None,
    }
}

#[tokio::test]
async fn test_sqlite_kv_roundtrip_and_reopen() {
    let tmp_dir = tempdir().expect("Failed to create temp dir");

    let store = SqliteKvStore::open_at(tmp_dir.path())
        .await
        .expect("Failed to open kv store");
    store.set("cache/a", "1".to_string()).await.unwrap();
    store.set("cache/a", "2".to_string()).await.unwrap();
    store.set("watchlist/b", "x".to_string()).await.unwrap();
    assert_eq!(store.get("cache/a").await.unwrap().as_deref(), Some("2"));

    store.remove("watchlist/b").await.unwrap();
    assert!(store.get("watchlist/b").await.unwrap().is_none());
    drop(store);

    // 重新打开后数据仍在
    assert!(tmp_dir.path().join("tracker.db").exists());
    let reopened = SqliteKvStore::open_at(tmp_dir.path()).await.unwrap();
    assert_eq!(reopened.get("cache/a").await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_watchlist_survives_restart_on_sqlite() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    {
        let backing: Arc<dyn KvStore> = Arc::new(SqliteKvStore::open_at(tmp_dir.path()).await?);
        let repo =
            KvWatchlist::load(Arc::new(ScopedStore::new(backing, WATCHLIST_NAMESPACE))).await?;
        repo.add(draft(4, "000001", "平安银行")).await?;
        repo.add(draft(5, "600519", "贵州茅台")).await?;
    }

    let backing: Arc<dyn KvStore> = Arc::new(SqliteKvStore::open_at(tmp_dir.path()).await?);
    let repo = KvWatchlist::load(Arc::new(ScopedStore::new(backing, WATCHLIST_NAMESPACE))).await?;
    let items = repo.list().await?;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "2025-03-04-000001.SZ");
    assert_eq!(items[1].id, "2025-03-05-600519.SH");
    Ok(())
}

#[tokio::test]
async fn test_watchlist_add_and_duplicate() {
    let repo = KvWatchlist::load(Arc::new(MemKvStore::new())).await.unwrap();

    let obs = repo.add(draft(4, "600001", "示例")).await.unwrap();
    assert_eq!(obs.code.to_string(), "600001.SH");

    let err = repo.add(draft(4, "600001", "示例")).await.unwrap_err();
    assert!(matches!(err, WatchlistError::Duplicate(id) if id == "2025-03-04-600001.SH"));

    // 同一代码不同日期可以共存
    repo.add(draft(5, "600001", "示例")).await.unwrap();
    assert_eq!(repo.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_watchlist_rejects_invalid_code() {
    let store = Arc::new(MemKvStore::new());
    let repo = KvWatchlist::load(store.clone()).await.unwrap();

    let err = repo.add(draft(4, "60001", "示例")).await.unwrap_err();
    assert!(matches!(err, WatchlistError::InvalidCode(_)));
    assert!(store.is_empty(), "failed add must not write");
}

#[tokio::test]
async fn test_watchlist_edits_preserve_identity() {
    let repo = KvWatchlist::load(Arc::new(MemKvStore::new())).await.unwrap();
    let obs = repo.add(draft(4, "000001", "平安银行")).await.unwrap();

    let updated = repo
        .update_reference(&obs.id, ReferenceSlot::High, 12.34)
        .await
        .unwrap();
    assert_eq!(updated.id, obs.id);
    assert_eq!(updated.reference_prices.high, 12.34);
    assert_eq!(updated.reference_prices.low, 10.5);

    let updated = repo
        .update_reference(&obs.id, ReferenceSlot::Low, 99.0)
        .await
        .unwrap();
    // 价格点 1 高于价格点 2 也是允许的
    assert_eq!(updated.reference_prices.low, 99.0);

    let err = repo
        .update_reference(&obs.id, ReferenceSlot::Low, -1.0)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchlistError::InvalidInput(_)));

    let noted = repo
        .update_notes(&obs.id, Some("放量突破".to_string()))
        .await
        .unwrap();
    assert_eq!(noted.notes.as_deref(), Some("放量突破"));
    let cleared = repo.update_notes(&obs.id, Some("   ".to_string())).await.unwrap();
    assert_eq!(cleared.notes, None);

    let err = repo.update_notes("missing", None).await.unwrap_err();
    assert!(matches!(err, WatchlistError::NotFound(_)));
}

#[tokio::test]
async fn test_watchlist_mutations_rewrite_document() {
    let store = Arc::new(MemKvStore::new());
    let repo = KvWatchlist::load(store.clone()).await.unwrap();
    let a = repo.add(draft(4, "000001", "平安银行")).await.unwrap();
    repo.add(draft(5, "600519", "贵州茅台")).await.unwrap();

    repo.remove(&a.id).await.unwrap();
    let raw = store.get(WATCHLIST_KEY).await.unwrap().unwrap();
    assert!(!raw.contains("000001.SZ"));
    assert!(raw.contains("600519.SH"));

    let err = repo.remove(&a.id).await.unwrap_err();
    assert!(matches!(err, WatchlistError::NotFound(_)));
}

#[tokio::test]
async fn test_export_then_import_roundtrip() {
    let source = KvWatchlist::load(Arc::new(MemKvStore::new())).await.unwrap();
    source.add(draft(6, "600519", "贵州茅台")).await.unwrap();
    source.add(draft(4, "000001", "平安银行")).await.unwrap();
    let noted = source.add(draft(5, "000002", "万科A")).await.unwrap();
    source
        .update_notes(&noted.id, Some("观察回踩".to_string()))
        .await
        .unwrap();

    let document = source.export_document().await.unwrap();

    let target = KvWatchlist::load(Arc::new(MemKvStore::new())).await.unwrap();
    target.add(draft(1, "300750", "宁德时代")).await.unwrap();
    let count = target.import_document(&document).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(target.list().await.unwrap(), source.list().await.unwrap());
}

#[tokio::test]
async fn test_import_accepts_legacy_export_and_rejects_garbage() {
    let repo = KvWatchlist::load(Arc::new(MemKvStore::new())).await.unwrap();
    let legacy = r#"[{"date":"2025-03-04","stockCode":"000001.SZ","stockName":"平安银行",
        "pricePoints":{"price1":10.5,"price2":11},"key":"2025-03-04-000001.SZ","notes":"旧备注"}]"#;

    assert_eq!(repo.import_document(legacy).await.unwrap(), 1);
    let obs = repo.get("2025-03-04-000001.SZ").await.unwrap().unwrap();
    assert_eq!(obs.reference_prices.high, 11.0);
    assert_eq!(obs.notes.as_deref(), Some("旧备注"));

    let err = repo.import_document("not json").await.unwrap_err();
    assert!(matches!(err, WatchlistError::Serialize(_)));
    // 解析失败时集合不变
    assert_eq!(repo.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cache_and_watchlist_share_backing_store() {
    let backing: Arc<dyn KvStore> = Arc::new(MemKvStore::new());
    let cache = ScopedStore::new(backing.clone(), CACHE_NAMESPACE);
    cache.set(WATCHLIST_KEY, "not a watchlist".to_string()).await.unwrap();

    let repo = KvWatchlist::load(Arc::new(ScopedStore::new(backing, WATCHLIST_NAMESPACE)))
        .await
        .unwrap();
    assert!(repo.list().await.unwrap().is_empty());
}
