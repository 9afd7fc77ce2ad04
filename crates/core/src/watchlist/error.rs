use crate::common::CodeError;
use crate::kv::error::KvError;
use thiserror::Error;

/// # Summary
/// 观察记录集合的错误枚举。
///
/// # Invariants
/// - 存储层错误通过 `#[from]` 原样透传。
#[derive(Error, Debug)]
pub enum WatchlistError {
    // 证券代码不是 6 位数字
    #[error("Invalid code: {0}")]
    InvalidCode(#[from] CodeError),
    // 其余字段校验失败 (名称为空、价格非正数等)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    // 相同日期与代码的记录已存在
    #[error("Observation already exists: {0}")]
    Duplicate(String),
    // 指定 ID 的记录不存在
    #[error("Observation not found: {0}")]
    NotFound(String),
    // 导入导出文档无法 (反) 序列化
    #[error("Serialize error: {0}")]
    Serialize(String),
    // 底层键值存储故障
    #[error("Store error: {0}")]
    Store(#[from] KvError),
}
