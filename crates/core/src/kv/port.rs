use crate::kv::error::KvError;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// # Summary
/// 持久化的本地键值存储接口 (Port)，键与值均为字符串。
///
/// # Invariants
/// - 写入的数据在进程重启后仍可读取 (内存实现仅用于测试)。
/// - 键空间由调用方通过命名空间前缀划分，接口本身不做隔离。
#[async_trait]
pub trait KvStore: Send + Sync {
    /// # Summary
    /// 读取指定键的值。
    ///
    /// # Arguments
    /// * `key`: 完整键名。
    ///
    /// # Returns
    /// 存在则返回 `Some(String)`，否则返回 `None`。
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// # Summary
    /// 写入指定键的值，存在同名键时直接覆盖。
    ///
    /// # Arguments
    /// * `key`: 完整键名。
    /// * `value`: 待写入的字符串。
    ///
    /// # Returns
    /// 成功返回 Ok，失败返回 `KvError`。
    async fn set(&self, key: &str, value: String) -> Result<(), KvError>;

    /// # Summary
    /// 删除指定键，键不存在时同样返回 Ok。
    async fn remove(&self, key: &str) -> Result<(), KvError>;
}

/// # Summary
/// 键值存储的 JSON 扩展接口。
///
/// # Invariants
/// - 自动为所有实现 `KvStore` 的类型提供支持。
#[async_trait]
pub trait KvStoreExt: KvStore {
    /// # Summary
    /// 以 JSON 文本形式存入强类型对象。
    ///
    /// # Logic
    /// 1. 使用 `serde_json` 序列化对象。
    /// 2. 调用底层 `set` 写入。
    async fn set_json<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), KvError> {
        let text = serde_json::to_string(value).map_err(|e| KvError::Serialize(e.to_string()))?;
        self.set(key, text).await
    }

    /// # Summary
    /// 读取并反序列化强类型对象。
    ///
    /// # Logic
    /// 1. 调用底层 `get` 获取文本。
    /// 2. 使用 `serde_json` 反序列化为目标类型。
    ///
    /// # Returns
    /// 反序列化后的对象或 None；文本格式不符时返回 `KvError::Deserialize`。
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, KvError> {
        match self.get(key).await? {
            Some(text) => {
                let val =
                    serde_json::from_str(&text).map_err(|e| KvError::Deserialize(e.to_string()))?;
                Ok(Some(val))
            }
            None => Ok(None),
        }
    }
}

impl<T: KvStore + ?Sized> KvStoreExt for T {}
