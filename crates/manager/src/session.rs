use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use tracker_chart::synth::synthesize;
use tracker_core::chart::entity::ChartDataset;
use tracker_core::common::normalize_trade_date;
use tracker_core::common::time::TimeProvider;
use tracker_core::market::port::HistoryService;
use tracker_core::watchlist::entity::Observation;
use tracker_core::watchlist::error::WatchlistError;
use tracker_core::watchlist::port::WatchlistStore;

/// # Summary
/// 会话层的统一错误类型。
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No observation is open")]
    NotOpen,
    #[error("Watchlist error: {0}")]
    Watchlist(#[from] WatchlistError),
}

/// # Summary
/// 图表视图的状态，四者互斥。
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    // 未打开任何观察记录
    Idle,
    // 正在解析行情并合成图表
    Loading,
    // 流水线失败，携带错误信息
    Failed(String),
    // 图表数据就绪
    Ready(Arc<ChartDataset>),
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }
}

/// 会话的可变部分，统一由一把锁保护。
#[derive(Default)]
struct SessionInner {
    // 当前打开的观察记录
    observation: Option<Observation>,
    // 高亮交易日 (紧凑格式)
    highlights: BTreeSet<String>,
    // 备注草稿，关闭时写回
    notes_draft: Option<String>,
    // 流水线代次，每次启动或关闭都会递增
    epoch: u64,
    // 进行中的流水线协程
    task: Option<JoinHandle<()>>,
}

/// # Summary
/// 单条观察记录的图表查看会话，负责 "解析行情 → 合成图表" 流水线的调度。
///
/// # Invariants
/// - 同一时刻最多只有一条流水线在运行；新的运行会中止旧的协程。
/// - 流水线结果只有在代次与当前代次一致时才会发布，过期结果直接丢弃。
/// - 关闭会话时仅写回备注，不修改观察记录的其他字段。
pub struct ChartSession {
    // 行情历史服务
    history: Arc<dyn HistoryService>,
    // 观察记录仓储
    watchlist: Arc<dyn WatchlistStore>,
    // 时间供给器
    clock: Arc<dyn TimeProvider>,
    // 视图状态发布通道
    state_tx: Arc<watch::Sender<ViewState>>,
    // 会话状态
    inner: Arc<Mutex<SessionInner>>,
}

impl ChartSession {
    /// # Summary
    /// 创建处于 `Idle` 状态的会话。
    ///
    /// # Arguments
    /// * `history`: 行情历史服务。
    /// * `watchlist`: 观察记录仓储，用于关闭时写回备注。
    /// * `clock`: 时间供给器，决定查询窗口的终点。
    pub fn new(
        history: Arc<dyn HistoryService>,
        watchlist: Arc<dyn WatchlistStore>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ViewState::Idle);
        Self {
            history,
            watchlist,
            clock,
            state_tx: Arc::new(state_tx),
            inner: Arc::new(Mutex::new(SessionInner::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// # Summary
    /// 打开观察记录并启动流水线。
    ///
    /// # Logic
    /// 1. 记录当前观察记录，备注草稿取自记录本身。
    /// 2. 清空高亮集合。
    /// 3. 启动流水线，状态切换为 `Loading`。
    pub fn open(&self, observation: Observation) {
        info!("Opening chart session for {}", observation.id);
        let mut inner = self.lock();
        inner.notes_draft = observation.notes.clone();
        inner.observation = Some(observation);
        inner.highlights.clear();
        self.start_pipeline(&mut inner);
    }

    /// # Summary
    /// 切换某个交易日的高亮状态并重新运行流水线。
    ///
    /// # Arguments
    /// * `date`: 交易日，接受 `YYYYMMDD` 或 `YYYY-MM-DD`。
    ///
    /// # Returns
    /// 切换后该日期是否处于高亮状态。
    pub fn toggle_highlight(&self, date: &str) -> Result<bool, SessionError> {
        let date = normalize_trade_date(date);
        let mut inner = self.lock();
        if inner.observation.is_none() {
            return Err(SessionError::NotOpen);
        }

        let highlighted = if inner.highlights.remove(&date) {
            false
        } else {
            inner.highlights.insert(date);
            true
        };
        self.start_pipeline(&mut inner);
        Ok(highlighted)
    }

    /// 当前高亮的交易日，按日期排序。
    pub fn highlights(&self) -> Vec<String> {
        self.lock().highlights.iter().cloned().collect()
    }

    /// # Summary
    /// 手动刷新：删除缓存项后重新运行流水线。
    ///
    /// # Logic
    /// 1. 持锁递增代次、中止进行中的流水线并发布 `Loading`。
    /// 2. 等待旧协程彻底结束，保证它不会在删除之后写回缓存。
    /// 3. 删除缓存项。
    /// 4. 代次未变时启动新的流水线；期间会话被关闭或切换则直接返回。
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let (observation, epoch, previous) = {
            let mut inner = self.lock();
            let observation = inner.observation.clone().ok_or(SessionError::NotOpen)?;
            inner.epoch += 1;
            let previous = inner.task.take();
            if let Some(task) = &previous {
                task.abort();
            }
            self.state_tx.send_replace(ViewState::Loading);
            (observation, inner.epoch, previous)
        };

        if let Some(task) = previous {
            if let Err(e) = task.await {
                debug!("Previous chart pipeline for {} stopped: {}", observation.id, e);
            }
        }
        self.history.invalidate(&observation, self.clock.now()).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!("Session changed during refresh of {}", observation.id);
            return Ok(());
        }
        info!("Refreshing chart for {}", observation.id);
        self.start_pipeline(&mut inner);
        Ok(())
    }

    /// 编辑备注草稿，空白内容视为清除备注。
    pub fn set_notes(&self, notes: Option<String>) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.observation.is_none() {
            return Err(SessionError::NotOpen);
        }
        inner.notes_draft = notes.filter(|n| !n.trim().is_empty());
        Ok(())
    }

    pub fn notes_draft(&self) -> Option<String> {
        self.lock().notes_draft.clone()
    }

    /// # Summary
    /// 关闭会话。
    ///
    /// # Logic
    /// 1. 中止进行中的流水线并递增代次，迟到的结果将被丢弃。
    /// 2. 清空高亮集合，状态重置为 `Idle`。
    /// 3. 备注草稿有变化时写回观察记录。
    ///
    /// # Returns
    /// 写回后的观察记录；未打开或备注未变化时返回 `None`。
    pub async fn close(&self) -> Result<Option<Observation>, SessionError> {
        let (observation, draft) = {
            let mut inner = self.lock();
            inner.epoch += 1;
            if let Some(task) = inner.task.take() {
                task.abort();
            }
            inner.highlights.clear();
            self.state_tx.send_replace(ViewState::Idle);
            (inner.observation.take(), inner.notes_draft.take())
        };

        let Some(observation) = observation else {
            return Ok(None);
        };
        info!("Closing chart session for {}", observation.id);
        if observation.notes == draft {
            return Ok(None);
        }
        let updated = self.watchlist.update_notes(&observation.id, draft).await?;
        Ok(Some(updated))
    }

    /// 当前视图状态的快照。
    pub fn state(&self) -> ViewState {
        self.state_tx.borrow().clone()
    }

    /// 订阅视图状态变化。
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state_tx.subscribe()
    }

    /// # Summary
    /// 等待当前流水线结束 (状态不再是 `Loading`)。
    pub async fn settled(&self) -> ViewState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|s| !s.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// # Summary
    /// 启动一次 "解析 → 合成" 流水线。
    ///
    /// # Logic
    /// 1. 递增代次并中止旧协程。
    /// 2. 发布 `Loading`。
    /// 3. 在新协程中解析行情、合成图表。
    /// 4. 持锁比对代次，一致时发布 `Ready` 或 `Failed`，否则丢弃。
    fn start_pipeline(&self, inner: &mut SessionInner) {
        let Some(observation) = inner.observation.clone() else {
            return;
        };
        inner.epoch += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        self.state_tx.send_replace(ViewState::Loading);

        let epoch = inner.epoch;
        let highlights = inner.highlights.clone();
        let history = self.history.clone();
        let now = self.clock.now();
        let state_tx = self.state_tx.clone();
        let shared = self.inner.clone();

        let handle: JoinHandle<()> = tokio::spawn(async move {
            let outcome = match history.resolve(&observation, now).await {
                Ok(bars) => synthesize(&bars, &observation, &highlights)
                    .map(Arc::new)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            let mut inner = shared.lock().unwrap_or_else(|e| e.into_inner());
            if inner.epoch != epoch {
                debug!("Discarding stale chart result for {}", observation.id);
                return;
            }
            inner.task = None;
            match outcome {
                Ok(dataset) => {
                    info!(
                        "Chart ready for {} ({} bars)",
                        observation.id,
                        dataset.dates.len()
                    );
                    state_tx.send_replace(ViewState::Ready(dataset));
                }
                Err(message) => {
                    error!("Chart pipeline failed for {}: {}", observation.id, message);
                    state_tx.send_replace(ViewState::Failed(message));
                }
            }
        });
        inner.task = Some(handle);
    }
}

impl Drop for ChartSession {
    fn drop(&mut self) {
        if let Some(task) = self.lock().task.take() {
            task.abort();
        }
    }
}
