use thiserror::Error;

/// # Summary
/// 图表合成错误。
///
/// # Invariants
/// - 任意一根 K 线无法解析即使整次合成失败，不产生部分结果。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    // 价格字段缺失或不是数字
    #[error("Malformed bar on {trade_date}: field `{field}` is not a number")]
    MalformedBar { trade_date: String, field: String },
}
