use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use tracker_core::common::time::TimeProvider;
use tracker_core::common::{SecurityCode, iso_date};
use tracker_core::kv::error::KvError;
use tracker_core::kv::port::{KvStore, KvStoreExt};
use tracker_core::market::entity::{FetchWindow, PriceHistory, RawBar};

/// 缓存项默认有效期：24 小时 (毫秒)。
pub const DEFAULT_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// # Summary
/// 行情缓存键，由规范化代码与 ISO 起止日期组成。
///
/// # Invariants
/// - 相同的 (代码, 窗口) 永远得到相同的键，与调用顺序无关。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// # Summary
    /// 构建缓存键，形如 `stock_data_600001.SH_2025-03-04_2025-05-03`。
    pub fn new(code: &SecurityCode, window: FetchWindow) -> Self {
        Self(format!(
            "stock_data_{}_{}_{}",
            code,
            iso_date(window.start),
            iso_date(window.end)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 落盘的缓存项：写入时间戳 (毫秒) 与原始行情序列。
#[derive(Deserialize)]
struct CacheEntry {
    timestamp: i64,
    data: PriceHistory,
}

/// 写入路径使用的借用版本，避免克隆整段序列。
#[derive(Serialize)]
struct CacheEntryRef<'a> {
    timestamp: i64,
    data: &'a [RawBar],
}

/// # Summary
/// 带过期时间的行情缓存。
///
/// # Invariants
/// - 缓存项仅在 `now - timestamp < ttl` 时有效；过期项在下一次读取时被删除。
/// - 底层存储的任何故障都只记录日志并降级为未命中，不向调用方暴露，也不重试。
pub struct TtlCache {
    // 底层键值存储 (通常为 `cache` 命名空间)
    store: Arc<dyn KvStore>,
    // 时间供给器
    clock: Arc<dyn TimeProvider>,
    // 有效期 (毫秒)
    ttl_ms: i64,
}

impl TtlCache {
    /// # Summary
    /// 使用默认 24 小时有效期创建缓存。
    ///
    /// # Arguments
    /// * `store`: 底层键值存储。
    /// * `clock`: 时间供给器。
    ///
    /// # Returns
    /// 初始化后的 TtlCache。
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            store,
            clock,
            ttl_ms: DEFAULT_TTL_MS,
        }
    }

    /// 覆盖默认有效期。
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = ttl.num_milliseconds();
        self
    }

    pub fn ttl(&self) -> Duration {
        Duration::milliseconds(self.ttl_ms)
    }

    /// # Summary
    /// 读取缓存的行情序列。
    ///
    /// # Logic
    /// 1. 键不存在返回 None。
    /// 2. 计算 `now - timestamp`，小于有效期则返回数据；差值溢出视为过期。
    /// 3. 已过期或内容无法解析时删除该项并返回 None。
    /// 4. 存储读取失败记录告警并视为未命中。
    ///
    /// # Arguments
    /// * `key`: 缓存键。
    ///
    /// # Returns
    /// 有效则返回 `Some(PriceHistory)`，否则返回 `None`。
    pub async fn get(&self, key: &CacheKey) -> Option<PriceHistory> {
        let entry = match self.store.get_json::<CacheEntry>(key.as_str()).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(KvError::Deserialize(e)) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                self.invalidate(key).await;
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}, treating as miss: {}", key, e);
                return None;
            }
        };

        // 时间戳异常导致溢出时按过期处理
        match self.clock.now().timestamp_millis().checked_sub(entry.timestamp) {
            Some(age_ms) if age_ms < self.ttl_ms => {
                debug!("Cache hit {} (age {} ms)", key, age_ms);
                Some(entry.data)
            }
            age_ms => {
                debug!("Cache entry {} expired (age {:?} ms)", key, age_ms);
                self.invalidate(key).await;
                None
            }
        }
    }

    /// # Summary
    /// 写入行情序列，无条件覆盖旧值。
    ///
    /// # Logic
    /// 以当前时间为时间戳写入；失败只记录告警，不重试。
    pub async fn put(&self, key: &CacheKey, payload: &[RawBar]) {
        let entry = CacheEntryRef {
            timestamp: self.clock.now().timestamp_millis(),
            data: payload,
        };
        if let Err(e) = self.store.set_json(key.as_str(), &entry).await {
            warn!("Cache write failed for {}, continuing without cache: {}", key, e);
        }
    }

    /// # Summary
    /// 无条件删除缓存项 (用户手动刷新)。
    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.store.remove(key.as_str()).await {
            warn!("Cache delete failed for {}: {}", key, e);
        }
    }
}
