use chrono::NaiveDate;
use thiserror::Error;

/// # Summary
/// 行情获取域错误枚举，区分传输层、数据源业务层与空结果。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - `DataUnavailable` 只由编排层产生，`source` 保存具体失败原因。
#[derive(Error, Debug)]
pub enum MarketError {
    // 缓存与远程均无法提供数据
    #[error("No price data for {code} [{start}..{end}]: {source}")]
    DataUnavailable {
        code: String,
        start: NaiveDate,
        end: NaiveDate,
        #[source]
        source: Box<MarketError>,
    },
    // 传输层失败 (连接错误或非 2xx 状态码)，携带响应详情
    #[error("Remote error: {0}")]
    Remote(String),
    // 数据源在格式正确的响应中声明失败
    #[error("Upstream error: {0}")]
    Upstream(String),
    // 数据源成功返回但没有任何 K 线
    #[error("Empty result")]
    EmptyResult,
    // 响应体无法解析
    #[error("Decode error: {0}")]
    Decode(String),
}

impl MarketError {
    /// 返回最内层的具体失败原因 (剥离 `DataUnavailable` 包装)。
    pub fn root_cause(&self) -> &MarketError {
        match self {
            MarketError::DataUnavailable { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
