use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use tracker_cache::ttl::{CacheKey, TtlCache};
use tracker_core::market::entity::{DEFAULT_LOOKBACK_DAYS, FetchWindow, PriceHistory};
use tracker_core::market::error::MarketError;
use tracker_core::market::port::{HistoryService, PriceSource};
use tracker_core::watchlist::entity::Observation;

/// # Summary
/// 行情历史解析器，`HistoryService` 的默认实现。
///
/// # Invariants
/// - 先查缓存，未命中时才访问远程数据源，且每次解析最多一次远程请求。
/// - 只有非空的成功结果才会写入缓存，失败结果从不缓存。
/// - 对外暴露的失败一律包装为 `MarketError::DataUnavailable`。
pub struct HistoryResolver {
    // 带过期时间的行情缓存
    cache: TtlCache,
    // 远程数据源
    source: Arc<dyn PriceSource>,
    // 观察窗口长度 (自然日)
    lookback_days: u64,
}

impl HistoryResolver {
    /// # Summary
    /// 创建解析器，观察窗口使用默认的 60 个自然日。
    ///
    /// # Arguments
    /// * `cache`: 行情缓存。
    /// * `source`: 远程数据源。
    pub fn new(cache: TtlCache, source: Arc<dyn PriceSource>) -> Self {
        Self {
            cache,
            source,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    /// 覆盖观察窗口长度。
    pub fn with_lookback_days(mut self, days: u64) -> Self {
        self.lookback_days = days;
        self
    }

    /// 计算观察记录在 `now` 时刻的查询窗口。
    pub fn window_for(&self, observation: &Observation, now: DateTime<Utc>) -> FetchWindow {
        FetchWindow::starting_at(observation.date, now.date_naive(), self.lookback_days)
    }

    fn key_for(&self, observation: &Observation, now: DateTime<Utc>) -> (CacheKey, FetchWindow) {
        let window = self.window_for(observation, now);
        (CacheKey::new(&observation.code, window), window)
    }

    async fn fetch_remote(
        &self,
        observation: &Observation,
        window: FetchWindow,
    ) -> Result<PriceHistory, MarketError> {
        let bars = self.source.fetch_daily(&observation.code, window).await?;
        if bars.is_empty() {
            return Err(MarketError::EmptyResult);
        }
        Ok(bars)
    }
}

#[async_trait]
impl HistoryService for HistoryResolver {
    /// # Summary
    /// 解析观察记录的行情序列。
    ///
    /// # Logic
    /// 1. 计算窗口与缓存键。
    /// 2. 缓存命中则原样返回。
    /// 3. 未命中请求远程；成功后写入缓存 (尽力而为) 再返回。
    /// 4. 远程失败包装为 `DataUnavailable`，保留具体原因。
    async fn resolve(
        &self,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Result<PriceHistory, MarketError> {
        let (key, window) = self.key_for(observation, now);

        if let Some(bars) = self.cache.get(&key).await {
            debug!("Serving {} bars for {} from cache", bars.len(), key);
            return Ok(bars);
        }

        info!("Cache miss for {}, fetching from remote source", key);
        match self.fetch_remote(observation, window).await {
            Ok(bars) => {
                self.cache.put(&key, &bars).await;
                info!("Fetched {} bars for {}", bars.len(), observation.code);
                Ok(bars)
            }
            Err(e) => Err(MarketError::DataUnavailable {
                code: observation.code.to_string(),
                start: window.start,
                end: window.end,
                source: Box::new(e),
            }),
        }
    }

    async fn invalidate(&self, observation: &Observation, now: DateTime<Utc>) {
        let (key, _) = self.key_for(observation, now);
        debug!("Invalidating cache entry {}", key);
        self.cache.invalidate(&key).await;
    }
}
