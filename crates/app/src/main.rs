mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracker_cache::scoped::{CACHE_NAMESPACE, ScopedStore, WATCHLIST_NAMESPACE};
use tracker_cache::ttl::TtlCache;
use tracker_core::common::time::{RealTimeProvider, TimeProvider};
use tracker_core::config::AppConfig;
use tracker_core::kv::port::KvStore;
use tracker_feed::http::HttpPriceSource;
use tracker_manager::session::ChartSession;
use tracker_market::resolver::HistoryResolver;
use tracker_store::kv::SqliteKvStore;
use tracker_store::watchlist::KvWatchlist;

use crate::cli::Cli;
use crate::commands::App;

/// # Summary
/// 加载配置：可选的配置文件叠加 `TRACKER__` 前缀的环境变量。
///
/// # Logic
/// 1. 指定了路径时该文件必须存在，否则尝试读取当前目录下的 `tracker.toml`。
/// 2. 环境变量以 `__` 分隔层级，例如 `TRACKER__FEED__BASE_URL`。
/// 3. 缺省字段使用 `AppConfig` 的默认值。
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name("tracker").required(false),
    };
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix("TRACKER").separator("__"))
        .build()
        .context("failed to load configuration")?;
    Ok(settings.try_deserialize()?)
}

/// 初始化日志：标准错误输出 + 数据目录下按天滚动的日志文件。
fn init_logging(data_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(data_dir, "tracker.log"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();
    Ok(guard)
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到会话与命令层。
///
/// # Logic
/// 1. 解析命令行并加载配置。
/// 2. 初始化全局日志。
/// 3. 实例化基础设施层 (SQLite 键值存储、HTTP 行情源)。
/// 4. 实例化领域实现层 (TTL 缓存、行情解析器、观察记录仓储)。
/// 5. 构造查看会话并执行命令。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // 1. 初始化日志
    let data_dir = PathBuf::from(&config.storage.data_dir);
    let _guard = init_logging(&data_dir)?;
    info!("Stock tracker starting (data dir: {})", data_dir.display());

    // 2. 实例化基础设施层
    tracker_store::config::set_root_dir(data_dir);
    let backing: Arc<dyn KvStore> = Arc::new(SqliteKvStore::new().await?);
    let source = Arc::new(HttpPriceSource::from_config(&config.feed)?);
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);

    // 3. 实例化领域实现层
    let ttl = i64::try_from(config.cache.ttl_hours)
        .ok()
        .and_then(chrono::Duration::try_hours)
        .context("cache.ttl_hours is out of range")?;
    let cache = TtlCache::new(
        Arc::new(ScopedStore::new(backing.clone(), CACHE_NAMESPACE)),
        clock.clone(),
    )
    .with_ttl(ttl);
    let resolver = Arc::new(
        HistoryResolver::new(cache, source).with_lookback_days(config.chart.lookback_days),
    );
    let watchlist =
        Arc::new(KvWatchlist::load(Arc::new(ScopedStore::new(backing, WATCHLIST_NAMESPACE))).await?);

    // 4. 构造会话并执行命令
    let session = ChartSession::new(resolver, watchlist.clone(), clock.clone());
    let app = App {
        watchlist,
        session,
        clock,
    };
    app.run(cli.command).await
}
