use crate::common::{SecurityCode, iso_date};
use crate::watchlist::error::WatchlistError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// # Summary
/// 用户选定的两个参考价位。
///
/// # Invariants
/// - 两者均为正数，但不要求 `low < high`，二者是相互独立的价位。
/// - JSON 字段沿用导出文件格式 (`price1` / `price2`)。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePrices {
    // 价格点 1
    #[serde(rename = "price1")]
    pub low: f64,
    // 价格点 2，涨幅与 1% 位置均以此为基准
    #[serde(rename = "price2")]
    pub high: f64,
}

/// # Summary
/// 参考价位选择器，用于单独修改某一个价位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSlot {
    Low,
    High,
}

/// # Summary
/// 观察记录实体，代表用户在某日对某只证券的一次记录。
///
/// # Invariants
/// - `id` 由 `date` 与 `code` 派生，在集合内唯一，修改价位或备注时保持不变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    // 观察日期
    pub date: NaiveDate,
    // 带交易所后缀的证券代码
    #[serde(rename = "stockCode")]
    pub code: SecurityCode,
    // 证券名称
    #[serde(rename = "stockName")]
    pub name: String,
    // 两个参考价位
    #[serde(rename = "pricePoints")]
    pub reference_prices: ReferencePrices,
    // 唯一标识
    #[serde(rename = "key")]
    pub id: String,
    // 备注
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Observation {
    /// 由日期与代码派生唯一标识，例如 `2025-03-04-600001.SH`。
    pub fn derive_id(date: NaiveDate, code: &SecurityCode) -> String {
        format!("{}-{}", iso_date(date), code)
    }
}

/// # Summary
/// 新建观察记录的输入，尚未校验。
#[derive(Debug, Clone)]
pub struct NewObservation {
    // 观察日期
    pub date: NaiveDate,
    // 用户输入的 6 位代码
    pub raw_code: String,
    // 证券名称
    pub name: String,
    // 价格点 1
    pub low: f64,
    // 价格点 2
    pub high: f64,
    // 可选备注
    pub notes: Option<String>,
}

impl NewObservation {
    /// # Summary
    /// 校验输入并生成观察记录。
    ///
    /// # Logic
    /// 1. 解析 6 位代码并追加交易所后缀。
    /// 2. 名称去除空白后不得为空。
    /// 3. 两个价位必须为有限正数，不校验二者大小关系。
    /// 4. 空白备注视为无备注。
    ///
    /// # Returns
    /// 校验通过返回 `Observation`，否则返回对应的 `WatchlistError`。
    pub fn into_observation(self) -> Result<Observation, WatchlistError> {
        let code = SecurityCode::parse(&self.raw_code)?;
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(WatchlistError::InvalidInput("name must not be empty".into()));
        }
        validate_price(self.low)?;
        validate_price(self.high)?;

        Ok(Observation {
            id: Observation::derive_id(self.date, &code),
            date: self.date,
            code,
            name,
            reference_prices: ReferencePrices {
                low: self.low,
                high: self.high,
            },
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// 参考价位必须是有限正数。
pub fn validate_price(value: f64) -> Result<(), WatchlistError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(WatchlistError::InvalidInput(format!(
            "reference price must be a positive number, got {value}"
        )))
    }
}
