use async_trait::async_trait;
use std::sync::Arc;
use tracker_core::kv::error::KvError;
use tracker_core::kv::port::KvStore;

/// 行情缓存使用的命名空间。
pub const CACHE_NAMESPACE: &str = "cache";
/// 观察记录集合使用的命名空间。
pub const WATCHLIST_NAMESPACE: &str = "watchlist";

/// # Summary
/// 为底层存储的所有键加上固定前缀，划分出独立的键空间。
///
/// # Invariants
/// - 实际键名为 `{namespace}/{key}`。
/// - 多个 `ScopedStore` 可以共享同一个底层存储而互不覆盖。
pub struct ScopedStore {
    inner: Arc<dyn KvStore>,
    prefix: String,
}

impl ScopedStore {
    pub fn new(inner: Arc<dyn KvStore>, namespace: &str) -> Self {
        Self {
            inner,
            prefix: format!("{namespace}/"),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl KvStore for ScopedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.inner.get(&self.full_key(key)).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.inner.set(&self.full_key(key), value).await
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        self.inner.remove(&self.full_key(key)).await
    }
}
