use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// 观察窗口默认长度 (自然日)。
pub const DEFAULT_LOOKBACK_DAYS: u64 = 60;

/// # Summary
/// 行情源返回的单个价格字段。
///
/// # Invariants
/// - 行情源可能以数字、数字字符串或 null 传递价格，原样保留以便缓存。
/// - 只有在合成图表时才转换为 `f64`。
/// - 字段缺失视为 `Missing`，其他 JSON 类型落入 `Other`，二者都不会使整批数据解析失败。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    Number(f64),
    Text(String),
    #[default]
    Missing,
    Other(serde_json::Value),
}

impl PriceField {
    /// # Summary
    /// 解析为有限浮点数。
    ///
    /// # Logic
    /// 1. 数字直接使用。
    /// 2. 字符串去除空白后整体解析，不接受 `"12abc"` 这类前缀数字。
    /// 3. null、NaN 与无穷大一律视为无效。
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            PriceField::Number(n) => *n,
            PriceField::Text(s) => s.trim().parse::<f64>().ok()?,
            PriceField::Missing | PriceField::Other(_) => return None,
        };
        v.is_finite().then_some(v)
    }
}

impl From<f64> for PriceField {
    fn from(value: f64) -> Self {
        PriceField::Number(value)
    }
}

/// # Summary
/// 单日 K 线原始数据，键为交易日。
///
/// # Invariants
/// - `trade_date` 为紧凑格式 `YYYYMMDD`。
/// - 获取后视为不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    // 交易日
    pub trade_date: String,
    // 开盘价
    #[serde(default)]
    pub open: PriceField,
    // 收盘价
    #[serde(default)]
    pub close: PriceField,
    // 最低价
    #[serde(default)]
    pub low: PriceField,
    // 最高价
    #[serde(default)]
    pub high: PriceField,
    // 成交量 (图表不使用，仅随缓存保留)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol: Option<PriceField>,
}

impl RawBar {
    /// 以数值价格构造 K 线，主要用于测试与内存数据源。
    pub fn new(trade_date: impl Into<String>, open: f64, close: f64, low: f64, high: f64) -> Self {
        Self {
            trade_date: trade_date.into(),
            open: open.into(),
            close: close.into(),
            low: low.into(),
            high: high.into(),
            vol: None,
        }
    }
}

/// 按交易日升序排列、交易日唯一的 K 线序列。
pub type PriceHistory = Vec<RawBar>;

/// # Summary
/// 一次行情查询的日期窗口 (闭区间)。
///
/// # Invariants
/// - `end` 不会晚于构造时给定的 `today`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    /// # Summary
    /// 计算观察记录的查询窗口。
    ///
    /// # Logic
    /// 1. 起点为观察日期。
    /// 2. 终点为起点加 `lookback_days` 个自然日。
    /// 3. 终点截断为 `min(终点, today)`，窗口永不延伸到未来。
    ///
    /// # Arguments
    /// * `start`: 观察日期。
    /// * `today`: 当前日期。
    /// * `lookback_days`: 向后观察的自然日数。
    pub fn starting_at(start: NaiveDate, today: NaiveDate, lookback_days: u64) -> Self {
        let end = start
            .checked_add_days(Days::new(lookback_days))
            .unwrap_or(NaiveDate::MAX)
            .min(today);
        Self { start, end }
    }
}
