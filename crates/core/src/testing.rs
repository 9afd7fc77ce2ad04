//! 测试辅助实现，仅在 `test-utils` 特性下编译。

use crate::common::SecurityCode;
use crate::market::entity::{FetchWindow, PriceHistory};
use crate::market::error::MarketError;
use crate::market::port::PriceSource;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// # Summary
/// 可编排的内存行情源，记录每次请求。
///
/// # Invariants
/// - 预置响应按先进先出消费，耗尽后返回默认序列。
/// - 设置闸门后，每次请求都会等待一次 `Notify` 放行。
pub struct MockPriceSource {
    default: PriceHistory,
    scripted: Mutex<VecDeque<Result<PriceHistory, MarketError>>>,
    requests: Mutex<Vec<(String, FetchWindow)>>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockPriceSource {
    pub fn new(default: PriceHistory) -> Self {
        Self {
            default,
            scripted: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// 请求在闸门放行前挂起，用于模拟慢速网络。
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// 追加一个一次性响应。
    pub fn push_response(&self, response: Result<PriceHistory, MarketError>) {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 返回已接收请求的 (代码, 窗口) 列表。
    pub fn requests(&self) -> Vec<(String, FetchWindow)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_daily(
        &self,
        code: &SecurityCode,
        window: FetchWindow,
    ) -> Result<PriceHistory, MarketError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((code.to_string(), window));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match scripted {
            Some(response) => response,
            None if self.default.is_empty() => Err(MarketError::EmptyResult),
            None => Ok(self.default.clone()),
        }
    }
}
