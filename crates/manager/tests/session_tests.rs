use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracker_cache::mem::MemKvStore;
use tracker_cache::ttl::TtlCache;
use tracker_core::chart::entity::ThresholdStyle;
use tracker_core::common::time::FakeClockProvider;
use tracker_core::kv::error::KvError;
use tracker_core::kv::port::KvStore;
use tracker_core::market::entity::{PriceHistory, RawBar};
use tracker_core::market::error::MarketError;
use tracker_core::testing::MockPriceSource;
use tracker_core::watchlist::entity::{NewObservation, Observation};
use tracker_core::watchlist::port::WatchlistStore;
use tracker_manager::session::{ChartSession, SessionError, ViewState};
use tracker_market::resolver::HistoryResolver;
use tracker_store::watchlist::KvWatchlist;

struct Harness {
    session: ChartSession,
    source: Arc<MockPriceSource>,
    watchlist: Arc<KvWatchlist>,
}

/// 删除后额外等待一段时间的缓存存储，用于放大刷新过程中的时间窗口。
struct SlowRemoveStore {
    inner: MemKvStore,
}

#[async_trait]
impl KvStore for SlowRemoveStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.inner.remove(key).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    }
}

fn bars() -> PriceHistory {
    vec![
        RawBar::new("20250303", 9.8, 9.9, 9.7, 10.0),
        RawBar::new("20250304", 9.9, 10.0, 9.8, 10.2),
        RawBar::new("20250305", 10.0, 10.1, 9.9, 10.3),
        RawBar::new("20250306", 10.1, 10.2, 10.0, 10.4),
        RawBar::new("20250307", 10.2, 10.0, 9.9, 10.3),
    ]
}

async fn harness(source: MockPriceSource) -> Harness {
    harness_with_cache(source, Arc::new(MemKvStore::new())).await
}

async fn harness_with_cache(source: MockPriceSource, cache_store: Arc<dyn KvStore>) -> Harness {
    let clock = Arc::new(FakeClockProvider::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
    ));
    let source = Arc::new(source);
    let cache = TtlCache::new(cache_store, clock.clone());
    let resolver = Arc::new(HistoryResolver::new(cache, source.clone()));
    let watchlist = Arc::new(KvWatchlist::load(Arc::new(MemKvStore::new())).await.unwrap());
    Harness {
        session: ChartSession::new(resolver, watchlist.clone(), clock),
        source,
        watchlist,
    }
}

async fn add_observation(watchlist: &KvWatchlist, notes: Option<&str>) -> Observation {
    watchlist
        .add(NewObservation {
            date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            raw_code: "000001".to_string(),
            name: "平安银行".to_string(),
            low: 9.5,
            high: 10.0,
            notes: notes.map(String::from),
        })
        .await
        .unwrap()
}

fn ready(state: ViewState) -> Arc<tracker_core::chart::entity::ChartDataset> {
    match state {
        ViewState::Ready(dataset) => dataset,
        other => panic!("expected Ready, got {other:?}"),
    }
}

#[tokio::test]
async fn test_open_loads_chart() {
    let h = harness(MockPriceSource::new(bars())).await;
    let obs = add_observation(&h.watchlist, None).await;
    assert_eq!(h.session.state(), ViewState::Idle);

    h.session.open(obs);
    let dataset = ready(h.session.settled().await);
    assert_eq!(dataset.title, "平安银行 (000001.SZ)");
    assert_eq!(dataset.dates.len(), 5);
    let threshold = dataset.projected_threshold.clone().unwrap();
    assert_eq!(threshold.date, "20250306");
    assert_eq!(threshold.price, 10.1);
    assert_eq!(threshold.style, ThresholdStyle::Reached);
}

#[tokio::test]
async fn test_toggle_highlight_reruns_from_cache() {
    let h = harness(MockPriceSource::new(bars())).await;
    let obs = add_observation(&h.watchlist, None).await;
    h.session.open(obs);
    h.session.settled().await;

    assert!(h.session.toggle_highlight("2025-03-06").unwrap());
    let dataset = ready(h.session.settled().await);
    assert_eq!(dataset.highlighted_highs.len(), 1);
    assert_eq!(dataset.highlighted_highs[0].date, "20250306");
    assert_eq!(h.session.highlights(), vec!["20250306".to_string()]);

    assert!(!h.session.toggle_highlight("20250306").unwrap());
    let dataset = ready(h.session.settled().await);
    assert!(dataset.highlighted_highs.is_empty());

    // 高亮切换命中缓存，不再请求远程
    assert_eq!(h.source.calls(), 1);
}

#[tokio::test]
async fn test_refresh_bypasses_cache() {
    let h = harness(MockPriceSource::new(bars())).await;
    let obs = add_observation(&h.watchlist, None).await;
    h.session.open(obs);
    h.session.settled().await;

    h.session.refresh().await.unwrap();
    ready(h.session.settled().await);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_failure_surfaces_message() {
    let source = MockPriceSource::new(bars());
    source.push_response(Err(MarketError::Upstream("quota exceeded".to_string())));
    let h = harness(source).await;
    let obs = add_observation(&h.watchlist, None).await;

    h.session.open(obs);
    match h.session.settled().await {
        ViewState::Failed(message) => assert!(message.contains("quota exceeded"), "{message}"),
        other => panic!("expected Failed, got {other:?}"),
    }

    // 失败不缓存，刷新后恢复
    h.session.refresh().await.unwrap();
    ready(h.session.settled().await);
}

#[tokio::test]
async fn test_close_writes_back_notes_only() {
    let h = harness(MockPriceSource::new(bars())).await;
    let obs = add_observation(&h.watchlist, Some("初始备注")).await;
    h.session.open(obs.clone());
    assert_eq!(h.session.notes_draft().as_deref(), Some("初始备注"));
    h.session.settled().await;
    h.session.toggle_highlight("20250304").unwrap();
    h.session.set_notes(Some("放量突破".to_string())).unwrap();

    let updated = h.session.close().await.unwrap().unwrap();
    assert_eq!(updated.notes.as_deref(), Some("放量突破"));
    assert_eq!(updated.reference_prices, obs.reference_prices);
    assert_eq!(h.session.state(), ViewState::Idle);
    assert!(h.session.highlights().is_empty());

    let stored = h.watchlist.get(&obs.id).await.unwrap().unwrap();
    assert_eq!(stored.notes.as_deref(), Some("放量突破"));

    // 再次关闭无事可做
    assert!(h.session.close().await.unwrap().is_none());
}

#[tokio::test]
async fn test_close_without_changes_skips_write() {
    let h = harness(MockPriceSource::new(bars())).await;
    let obs = add_observation(&h.watchlist, Some("备注")).await;
    h.session.open(obs);
    h.session.settled().await;
    assert!(h.session.close().await.unwrap().is_none());
}

#[tokio::test]
async fn test_operations_require_open_session() {
    let h = harness(MockPriceSource::new(bars())).await;
    assert!(matches!(
        h.session.toggle_highlight("20250304"),
        Err(SessionError::NotOpen)
    ));
    assert!(matches!(
        h.session.set_notes(Some("x".to_string())),
        Err(SessionError::NotOpen)
    ));
    assert!(matches!(h.session.refresh().await, Err(SessionError::NotOpen)));
}

#[tokio::test]
async fn test_close_discards_inflight_result() {
    let gate = Arc::new(Notify::new());
    let h = harness(MockPriceSource::new(bars()).with_gate(gate.clone())).await;
    let obs = add_observation(&h.watchlist, None).await;

    h.session.open(obs);
    assert_eq!(h.session.state(), ViewState::Loading);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.source.calls(), 1);

    h.session.close().await.unwrap();
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.session.state(), ViewState::Idle);
}

#[tokio::test]
async fn test_newer_run_supersedes_older() {
    let gate = Arc::new(Notify::new());
    let h = harness(MockPriceSource::new(bars()).with_gate(gate.clone())).await;
    let obs = add_observation(&h.watchlist, None).await;

    h.session.open(obs);
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.session.toggle_highlight("20250307").unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.notify_one();

    let dataset = ready(h.session.settled().await);
    assert_eq!(dataset.highlighted_highs.len(), 1);
    assert_eq!(h.source.calls(), 2);
}

#[tokio::test]
async fn test_refresh_during_inflight_load_fetches_again() {
    let gate = Arc::new(Notify::new());
    let store = Arc::new(SlowRemoveStore {
        inner: MemKvStore::new(),
    });
    let h = harness_with_cache(
        MockPriceSource::new(bars()).with_gate(gate.clone()),
        store.clone(),
    )
    .await;
    let obs = add_observation(&h.watchlist, None).await;
    let session = Arc::new(h.session);

    session.open(obs);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.source.calls(), 1);

    let refreshing = {
        let session = session.clone();
        tokio::spawn(async move { session.refresh().await })
    };
    // 刷新仍在删除缓存项时放行首次请求
    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.notify_one();
    refreshing.await.unwrap().unwrap();

    ready(session.settled().await);
    assert_eq!(h.source.calls(), 2);
    assert_eq!(store.inner.len(), 1);
}
