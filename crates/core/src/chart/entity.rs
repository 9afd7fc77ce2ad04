use serde::{Deserialize, Serialize};

/// 单根 K 线的图表表示：`[open, close, low, high]`。
pub type BarValues = [f64; 4];

/// # Summary
/// 涨幅的方向，决定展示颜色。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    // 涨幅 >= 0
    Up,
    // 涨幅 < 0
    Down,
}

/// # Summary
/// 相对参考价位 2 的涨幅百分比。
///
/// # Invariants
/// - `percent` 已四舍五入到 2 位小数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gain {
    pub percent: f64,
    pub polarity: Polarity,
}

/// # Summary
/// 单根 K 线的涨幅 (最高价与收盘价)，用于提示框展示。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarGains {
    pub high: Gain,
    pub close: Gain,
}

/// # Summary
/// 参考价位标记的种类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    // 价格点 1
    Low,
    // 价格点 2
    High,
}

/// # Summary
/// 观察日上的参考价位标记。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMarker {
    pub kind: ReferenceKind,
    pub date: String,
    pub price: f64,
}

/// # Summary
/// 1% 位置标记的两种样式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdStyle {
    // 次日收盘价达到或超过阈值
    Reached,
    // 次日收盘价低于阈值
    Missed,
}

/// # Summary
/// 观察日次一交易日的 1% 位置标记。
///
/// # Invariants
/// - `price` 为参考价位 2 的 1.01 倍，保留 3 位小数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdMarker {
    pub date: String,
    pub price: f64,
    pub style: ThresholdStyle,
}

/// # Summary
/// 用户高亮的交易日最高价标记。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightMarker {
    pub date: String,
    pub high: f64,
    pub gain: Gain,
}

/// # Summary
/// 合成后的完整图表数据，交给渲染层使用。
///
/// # Invariants
/// - `dates`、`bars`、`gains` 三者长度相同且一一对应。
/// - 纯派生数据，不持有任何外部资源。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    // 图表标题，例如 `平安银行 (000001.SZ)`
    pub title: String,
    // 交易日序列 (紧凑格式)
    pub dates: Vec<String>,
    // K 线数值序列
    pub bars: Vec<BarValues>,
    // 每根 K 线的涨幅
    pub gains: Vec<BarGains>,
    // 观察日上的两个参考价位
    pub reference_markers: Vec<ReferenceMarker>,
    // 次一交易日的 1% 位置
    pub projected_threshold: Option<ThresholdMarker>,
    // 高亮交易日的最高价
    pub highlighted_highs: Vec<HighlightMarker>,
}
