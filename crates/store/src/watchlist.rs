use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use tracker_core::kv::port::{KvStore, KvStoreExt};
use tracker_core::watchlist::entity::{
    NewObservation, Observation, ReferenceSlot, validate_price,
};
use tracker_core::watchlist::error::WatchlistError;
use tracker_core::watchlist::port::WatchlistStore;

/// 观察记录集合在键值存储中的键名。
pub const WATCHLIST_KEY: &str = "stockTrackerData";

/// WatchlistStore 的键值存储实现。
///
/// # Summary
/// 整个集合序列化为一个 JSON 文档保存在单个键下，启动时一次性加载到内存，
/// 每次变更后整体重写。
///
/// # Invariants
/// * 内存副本只在落盘成功后才更新，二者始终一致。
/// * 写锁覆盖 "修改 + 落盘" 全过程，单进程内变更串行执行。
pub struct KvWatchlist {
    // 键值存储 (通常为 `watchlist` 命名空间)
    store: Arc<dyn KvStore>,
    // 内存中的集合副本，保持插入顺序
    items: RwLock<Vec<Observation>>,
}

impl KvWatchlist {
    /// 从存储中加载集合。
    ///
    /// # Logic
    /// 1. 读取 `stockTrackerData` 键。
    /// 2. 键不存在时以空集合启动。
    ///
    /// # Returns
    /// * `Result<Self, WatchlistError>` - 仓储实例；文档损坏时返回存储错误。
    pub async fn load(store: Arc<dyn KvStore>) -> Result<Self, WatchlistError> {
        let items: Vec<Observation> = store.get_json(WATCHLIST_KEY).await?.unwrap_or_default();
        info!("Watchlist loaded with {} observations", items.len());
        Ok(Self {
            store,
            items: RwLock::new(items),
        })
    }

    async fn persist(&self, items: &[Observation]) -> Result<(), WatchlistError> {
        self.store.set_json(WATCHLIST_KEY, &items).await?;
        debug!("Watchlist persisted ({} observations)", items.len());
        Ok(())
    }

    /// 对指定记录执行修改并整体落盘，返回修改后的记录。
    async fn modify<F>(&self, id: &str, apply: F) -> Result<Observation, WatchlistError>
    where
        F: FnOnce(&mut Observation) + Send,
    {
        let mut items = self.items.write().await;
        let mut next = items.clone();
        let target = next
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| WatchlistError::NotFound(id.to_string()))?;
        apply(target);
        let updated = target.clone();

        self.persist(&next).await?;
        *items = next;
        Ok(updated)
    }
}

#[async_trait]
impl WatchlistStore for KvWatchlist {
    async fn list(&self) -> Result<Vec<Observation>, WatchlistError> {
        Ok(self.items.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Observation>, WatchlistError> {
        Ok(self.items.read().await.iter().find(|o| o.id == id).cloned())
    }

    /// # Summary
    /// 校验并追加新记录。
    ///
    /// # Logic
    /// 1. 校验输入并派生 ID。
    /// 2. 检查重复。
    /// 3. 追加后整体落盘。
    async fn add(&self, draft: NewObservation) -> Result<Observation, WatchlistError> {
        let observation = draft.into_observation()?;

        let mut items = self.items.write().await;
        if items.iter().any(|o| o.id == observation.id) {
            return Err(WatchlistError::Duplicate(observation.id));
        }
        let mut next = items.clone();
        next.push(observation.clone());

        self.persist(&next).await?;
        *items = next;
        info!("Observation {} added", observation.id);
        Ok(observation)
    }

    async fn update_reference(
        &self,
        id: &str,
        slot: ReferenceSlot,
        value: f64,
    ) -> Result<Observation, WatchlistError> {
        validate_price(value)?;
        self.modify(id, |o| match slot {
            ReferenceSlot::Low => o.reference_prices.low = value,
            ReferenceSlot::High => o.reference_prices.high = value,
        })
        .await
    }

    async fn update_notes(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<Observation, WatchlistError> {
        let notes = notes.filter(|n| !n.trim().is_empty());
        self.modify(id, |o| o.notes = notes).await
    }

    async fn remove(&self, id: &str) -> Result<(), WatchlistError> {
        let mut items = self.items.write().await;
        let next: Vec<Observation> = items.iter().filter(|o| o.id != id).cloned().collect();
        if next.len() == items.len() {
            return Err(WatchlistError::NotFound(id.to_string()));
        }

        self.persist(&next).await?;
        *items = next;
        info!("Observation {} removed", id);
        Ok(())
    }

    async fn export_document(&self) -> Result<String, WatchlistError> {
        let items = self.items.read().await;
        serde_json::to_string(&*items).map_err(|e| WatchlistError::Serialize(e.to_string()))
    }

    /// # Summary
    /// 以文档整体替换集合。
    ///
    /// # Logic
    /// 1. 解析文档，解析失败时集合保持不变。
    /// 2. 落盘后替换内存副本。
    async fn import_document(&self, document: &str) -> Result<usize, WatchlistError> {
        let imported: Vec<Observation> =
            serde_json::from_str(document).map_err(|e| WatchlistError::Serialize(e.to_string()))?;

        let mut items = self.items.write().await;
        self.persist(&imported).await?;
        let count = imported.len();
        *items = imported;
        info!("Watchlist replaced by import ({} observations)", count);
        Ok(count)
    }
}
