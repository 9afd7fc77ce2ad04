use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::warn;

static ROOT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// 未设置根目录时使用的默认路径。
const DEFAULT_ROOT_DIR: &str = "data";

/// 设置存储层的数据根目录。
///
/// # Logic
/// 1. 尝试将指定的路径保存到全局静态变量中。
/// 2. 如果已经设置过，则本次设置无效，记录告警。
///
/// # Arguments
/// * `path` - 存储数据的根目录路径 (来自 `storage.data_dir`)。
pub fn set_root_dir(path: PathBuf) {
    if let Err(rejected) = ROOT_DIR.set(path) {
        warn!(
            "Data root already set to {}, ignoring {}",
            root_dir().display(),
            rejected.display()
        );
    }
}

/// 获取当前配置的数据根目录，未设置时返回 `data`。
pub fn root_dir() -> PathBuf {
    ROOT_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR))
}
