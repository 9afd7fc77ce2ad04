use anyhow::{Context, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracker_core::common::iso_date;
use tracker_core::common::time::TimeProvider;
use tracker_core::watchlist::entity::{NewObservation, Observation};
use tracker_core::watchlist::port::WatchlistStore;
use tracker_manager::session::{ChartSession, ViewState};

use crate::cli::Commands;

/// 命令执行所需的已装配组件。
pub struct App {
    pub watchlist: Arc<dyn WatchlistStore>,
    pub session: ChartSession,
    pub clock: Arc<dyn TimeProvider>,
}

fn describe(obs: &Observation) -> String {
    let mut line = format!(
        "{}  {}  price1={}  price2={}",
        obs.id, obs.name, obs.reference_prices.low, obs.reference_prices.high
    );
    if let Some(notes) = &obs.notes {
        line.push_str("  # ");
        line.push_str(notes);
    }
    line
}

impl App {
    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Add {
                date,
                code,
                name,
                low,
                high,
                notes,
            } => {
                let obs = self
                    .watchlist
                    .add(NewObservation {
                        date,
                        raw_code: code,
                        name,
                        low,
                        high,
                        notes,
                    })
                    .await?;
                println!("{}", describe(&obs));
            }
            Commands::List => {
                for obs in self.watchlist.list().await? {
                    println!("{}", describe(&obs));
                }
            }
            Commands::SetPrice { id, slot, value } => {
                let obs = self
                    .watchlist
                    .update_reference(&id, slot.into(), value)
                    .await?;
                println!("{}", describe(&obs));
            }
            Commands::Note { id, text } => {
                let obs = self.watchlist.update_notes(&id, text).await?;
                println!("{}", describe(&obs));
            }
            Commands::Remove { id } => {
                self.watchlist.remove(&id).await?;
                println!("removed {id}");
            }
            Commands::Chart {
                id,
                highlights,
                refresh,
                notes,
                pretty,
            } => self.chart(&id, &highlights, refresh, notes, pretty).await?,
            Commands::Export { path } => {
                let path = path.unwrap_or_else(|| {
                    PathBuf::from(format!(
                        "stock_data_{}.json",
                        iso_date(self.clock.now().date_naive())
                    ))
                });
                let document = self.watchlist.export_document().await?;
                std::fs::write(&path, document)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!("Watchlist exported to {}", path.display());
                println!("exported to {}", path.display());
            }
            Commands::Import { path } => {
                let document = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let count = self.watchlist.import_document(&document).await?;
                println!("imported {count} observations");
            }
        }
        Ok(())
    }

    /// # Summary
    /// 打开查看会话，应用刷新与高亮后输出图表数据。
    ///
    /// # Logic
    /// 1. 打开会话 (启动流水线)。
    /// 2. 按需刷新，然后依次切换高亮，每次切换都会取代前一次运行。
    /// 3. 等待最终结果，关闭会话 (写回备注) 后输出 JSON 或报错。
    async fn chart(
        &self,
        id: &str,
        highlights: &[String],
        refresh: bool,
        notes: Option<String>,
        pretty: bool,
    ) -> anyhow::Result<()> {
        let observation = self
            .watchlist
            .get(id)
            .await?
            .with_context(|| format!("observation not found: {id}"))?;

        self.session.open(observation);
        if refresh {
            self.session.refresh().await?;
        }
        for date in highlights {
            self.session.toggle_highlight(date)?;
        }
        if let Some(text) = notes {
            self.session.set_notes(Some(text))?;
        }
        let state = self.session.settled().await;
        self.session.close().await?;

        match state {
            ViewState::Ready(dataset) => {
                let json = if pretty {
                    serde_json::to_string_pretty(&*dataset)?
                } else {
                    serde_json::to_string(&*dataset)?
                };
                println!("{json}");
                Ok(())
            }
            ViewState::Failed(message) => bail!(message),
            other => bail!("chart did not settle: {other:?}"),
        }
    }
}
