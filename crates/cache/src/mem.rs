use async_trait::async_trait;
use dashmap::DashMap;
use tracker_core::kv::error::KvError;
use tracker_core::kv::port::KvStore;

/// # Summary
/// 基于 DashMap 的内存键值存储实现。
///
/// # Invariants
/// - 所有操作均通过并发哈希表 `DashMap` 执行，保证多线程安全。
/// - 数据不落盘，进程退出即丢失，仅用于测试与临时会话。
pub struct MemKvStore {
    // 线程安全的 KV 存储容器
    storage: DashMap<String, String>,
}

impl MemKvStore {
    /// # Summary
    /// 创建一个空的 MemKvStore 实例。
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// 当前保存的键数量。
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// 判断键是否存在，不触发任何过期逻辑。
    pub fn contains_key(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }
}

impl Default for MemKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemKvStore {
    /// # Summary
    /// 读取键值。
    ///
    /// # Logic
    /// 从哈希表中检索 Key 对应的引用，并将其克隆为独立的所有权对象返回。
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.storage.get(key).map(|v| v.value().clone()))
    }

    /// # Summary
    /// 写入键值，若存在同名 Key 则覆盖。
    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.storage.insert(key.to_string(), value);
        Ok(())
    }

    /// # Summary
    /// 删除指定键，无论键是否存在均返回 Ok。
    async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.storage.remove(key);
        Ok(())
    }
}
