//! 领域核心：实体、错误与端口 (Port) 定义。
//!
//! 本 crate 不包含任何 I/O 实现，所有具体适配器位于下游 crate，
//! 通过 `Arc<dyn Trait>` 注入。

pub mod chart;
pub mod common;
pub mod config;
pub mod kv;
pub mod market;
pub mod watchlist;

#[cfg(feature = "test-utils")]
pub mod testing;
