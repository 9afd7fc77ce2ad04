pub mod time;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// 沪市代码下限，大于等于该值的 6 位代码归属上交所。
const SHANGHAI_THRESHOLD: u32 = 600_000;

/// # Summary
/// 证券代码解析错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("Security code must be exactly 6 digits, got: {0:?}")]
    InvalidFormat(String),
    #[error("Unknown exchange suffix: {0:?}")]
    UnknownExchange(String),
}

/// # Summary
/// 交易所枚举，决定证券代码的后缀。
///
/// # Invariants
/// - `Shanghai` 对应后缀 `SH`，`Shenzhen` 对应后缀 `SZ`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Exchange {
    // 上海证券交易所
    Shanghai,
    // 深圳证券交易所
    Shenzhen,
}

impl Exchange {
    /// # Summary
    /// 按数值阈值规则为 6 位代码选择交易所。
    ///
    /// # Logic
    /// 代码数值 >= 600000 归属上海，其余归属深圳。
    pub fn for_digits(value: u32) -> Self {
        if value >= SHANGHAI_THRESHOLD {
            Exchange::Shanghai
        } else {
            Exchange::Shenzhen
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "SH",
            Exchange::Shenzhen => "SZ",
        }
    }
}

impl FromStr for Exchange {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SH" => Ok(Exchange::Shanghai),
            "SZ" => Ok(Exchange::Shenzhen),
            _ => Err(CodeError::UnknownExchange(s.to_string())),
        }
    }
}

/// # Summary
/// 规范化后的证券代码，形如 `600001.SH`。
///
/// # Invariants
/// - `digits` 恒为 6 位 ASCII 数字。
/// - `exchange` 由 `digits` 按阈值规则推导，二者始终一致。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecurityCode {
    // 6 位数字代码
    digits: String,
    // 所属交易所
    exchange: Exchange,
}

impl SecurityCode {
    /// # Summary
    /// 解析用户输入的原始代码并追加交易所后缀。
    ///
    /// # Logic
    /// 1. 去除首尾空白。
    /// 2. 校验是否恰好 6 位数字。
    /// 3. 按数值阈值推导交易所。
    ///
    /// # Arguments
    /// * `raw`: 用户输入，例如 `"600001"`。
    ///
    /// # Returns
    /// 成功返回规范化代码，失败返回 `CodeError::InvalidFormat`。
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        let digits = raw.trim();
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodeError::InvalidFormat(raw.to_string()));
        }
        let value: u32 = digits
            .parse()
            .map_err(|_| CodeError::InvalidFormat(raw.to_string()))?;
        Ok(Self {
            digits: digits.to_string(),
            exchange: Exchange::for_digits(value),
        })
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn exchange(&self) -> Exchange {
        self.exchange
    }
}

impl FromStr for SecurityCode {
    type Err = CodeError;

    /// 同时接受裸代码 (`000001`) 与带后缀代码 (`000001.SZ`)。
    /// 带后缀时后缀必须与阈值规则推导的结果一致。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            None => Self::parse(s),
            Some((digits, suffix)) => {
                let code = Self::parse(digits)?;
                let exchange: Exchange = suffix.parse()?;
                if exchange != code.exchange {
                    return Err(CodeError::UnknownExchange(suffix.to_string()));
                }
                Ok(code)
            }
        }
    }
}

impl TryFrom<String> for SecurityCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SecurityCode> for String {
    fn from(code: SecurityCode) -> Self {
        code.to_string()
    }
}

impl std::fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.digits, self.exchange.suffix())
    }
}

/// 行情源使用的紧凑日期格式 `YYYYMMDD`。
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// 请求参数与缓存键使用的 ISO 日期格式 `YYYY-MM-DD`。
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// # Summary
/// 将用户输入的交易日统一为紧凑格式。
///
/// # Logic
/// 去除空白与 `-` 分隔符，`2025-03-04` 与 `20250304` 得到相同结果。
pub fn normalize_trade_date(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '-').collect()
}
