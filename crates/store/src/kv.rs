use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::path::Path;
use tracing::info;
use tracker_core::kv::error::KvError;
use tracker_core::kv::port::KvStore;

/// 默认键值数据库文件名
const DEFAULT_KV_DB: &str = "tracker.db";

/// KvStore 的 SQLite 实现。
///
/// # Summary
/// 在单个 SQLite 文件中以 `kv_entries(key, value)` 表保存全部键值，
/// 观察记录集合与行情缓存通过命名空间前缀共用这一张表。
///
/// # Invariants
/// * 表结构在实例创建时初始化。
/// * 所有操作均通过共享的 `SqlitePool` 执行。
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    /// 在配置的数据根目录下打开 (或创建) 默认数据库。
    ///
    /// # Returns
    /// * `Result<Self, KvError>` - 存储实例或数据库错误。
    pub async fn new() -> Result<Self, KvError> {
        Self::open_at(&crate::config::root_dir()).await
    }

    /// 在指定目录下打开 (或创建) 默认数据库。
    ///
    /// # Logic
    /// 1. 确保目录存在。
    /// 2. 配置 SQLite 连接选项，开启 `create_if_missing`。
    /// 3. 连接到数据库并执行 DDL 初始化表结构。
    ///
    /// # Arguments
    /// * `dir` - 数据库所在目录。
    pub async fn open_at(dir: &Path) -> Result<Self, KvError> {
        std::fs::create_dir_all(dir).map_err(|e| KvError::Storage(e.to_string()))?;
        let db_path = dir.join(DEFAULT_KV_DB);

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| KvError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| KvError::Storage(e.to_string()))?;

        info!("Key-value store opened at {}", db_path.display());
        Ok(Self { pool })
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    /// # Summary
    /// 读取键值。
    ///
    /// # Logic
    /// 查询 `kv_entries` 表。
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let row = sqlx::query_as::<_, (String,)>("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| KvError::Storage(e.to_string()))?;
        Ok(row.map(|r| r.0))
    }

    /// # Summary
    /// 写入键值。
    ///
    /// # Logic
    /// 在 `kv_entries` 表上执行 `INSERT OR REPLACE`。
    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        sqlx::query("INSERT OR REPLACE INTO kv_entries (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| KvError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| KvError::Storage(e.to_string()))?;
        Ok(())
    }
}
