use crate::watchlist::entity::{NewObservation, Observation, ReferenceSlot};
use crate::watchlist::error::WatchlistError;
use async_trait::async_trait;

/// # Summary
/// 观察记录集合的持久化接口。
///
/// # Invariants
/// - 集合在启动时整体加载，每次变更后整体重写 (后写者胜)。
/// - 记录 ID 在集合内唯一。
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// # Summary
    /// 按插入顺序返回全部观察记录。
    async fn list(&self) -> Result<Vec<Observation>, WatchlistError>;

    /// # Summary
    /// 根据 ID 查询观察记录。
    ///
    /// # Returns
    /// 存在则返回 `Some(Observation)`，否则返回 `None`。
    async fn get(&self, id: &str) -> Result<Option<Observation>, WatchlistError>;

    /// # Summary
    /// 校验并追加一条新记录。
    ///
    /// # Logic
    /// 1. 校验代码、名称与价位。
    /// 2. 检查 ID 是否重复。
    /// 3. 追加到集合末尾并整体落盘。
    ///
    /// # Arguments
    /// * `draft`: 用户输入。
    ///
    /// # Returns
    /// 成功返回新记录，重复时返回 `WatchlistError::Duplicate`。
    async fn add(&self, draft: NewObservation) -> Result<Observation, WatchlistError>;

    /// # Summary
    /// 修改某一个参考价位，记录 ID 保持不变。
    async fn update_reference(
        &self,
        id: &str,
        slot: ReferenceSlot,
        value: f64,
    ) -> Result<Observation, WatchlistError>;

    /// # Summary
    /// 修改备注；`None` 或空白文本清除备注。
    async fn update_notes(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<Observation, WatchlistError>;

    /// # Summary
    /// 删除指定记录，不存在时返回 `WatchlistError::NotFound`。
    async fn remove(&self, id: &str) -> Result<(), WatchlistError>;

    /// # Summary
    /// 将整个集合导出为 JSON 文档。
    async fn export_document(&self) -> Result<String, WatchlistError>;

    /// # Summary
    /// 以 JSON 文档整体替换集合。
    ///
    /// # Logic
    /// 1. 解析文档，除解析成功外不做额外校验。
    /// 2. 替换内存集合并整体落盘。
    ///
    /// # Returns
    /// 成功返回导入的记录数。
    async fn import_document(&self, document: &str) -> Result<usize, WatchlistError>;
}
