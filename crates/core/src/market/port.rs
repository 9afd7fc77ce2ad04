use crate::common::SecurityCode;
use crate::market::entity::{FetchWindow, PriceHistory};
use crate::market::error::MarketError;
use crate::watchlist::entity::Observation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// 远程行情数据源接口 (原始数据提供者)。
///
/// # Invariants
/// - 返回的序列按交易日升序排列。
/// - 单次调用只发起一次请求，不做重试。
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// # Summary
    /// 获取指定证券在窗口内的日线数据。
    ///
    /// # Logic
    /// 1. 构建数据源请求 (代码 + ISO 起止日期)。
    /// 2. 执行网络请求并解析响应。
    /// 3. 将传输失败、业务失败与空结果映射为对应的 `MarketError`。
    ///
    /// # Arguments
    /// * `code`: 带交易所后缀的证券代码。
    /// * `window`: 查询日期窗口。
    ///
    /// # Returns
    /// 成功返回至少包含一根 K 线的序列。
    async fn fetch_daily(
        &self,
        code: &SecurityCode,
        window: FetchWindow,
    ) -> Result<PriceHistory, MarketError>;
}

/// # Summary
/// 行情历史解析服务契约 (缓存优先，远程兜底)。
///
/// # Invariants
/// - TTL 内对同一 (代码, 窗口) 的重复调用最多触发一次远程请求。
#[async_trait]
pub trait HistoryService: Send + Sync {
    /// # Summary
    /// 解析观察记录对应的行情序列。
    ///
    /// # Logic
    /// 1. 根据观察日期与 `now` 计算查询窗口。
    /// 2. 命中缓存直接返回。
    /// 3. 未命中则请求远程数据源并写入缓存。
    ///
    /// # Arguments
    /// * `observation`: 观察记录。
    /// * `now`: 当前时间，用于截断窗口终点。
    ///
    /// # Returns
    /// 成功返回行情序列，失败返回 `MarketError::DataUnavailable`。
    async fn resolve(
        &self,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Result<PriceHistory, MarketError>;

    /// # Summary
    /// 删除观察记录当前窗口对应的缓存项，强制下次解析走远程。
    async fn invalidate(&self, observation: &Observation, now: DateTime<Utc>);
}
