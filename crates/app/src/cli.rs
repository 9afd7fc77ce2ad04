use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracker_core::watchlist::entity::ReferenceSlot;

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Stock observation tracker", long_about = None)]
pub struct Cli {
    /// Optional configuration file (defaults to ./tracker.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which reference price to edit
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SlotArg {
    /// Price point 1
    Low,
    /// Price point 2 (basis for gains and the 1% threshold)
    High,
}

impl From<SlotArg> for ReferenceSlot {
    fn from(slot: SlotArg) -> Self {
        match slot {
            SlotArg::Low => ReferenceSlot::Low,
            SlotArg::High => ReferenceSlot::High,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new observation
    Add {
        /// Observation date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,
        /// Six-digit security code, e.g. 000001
        #[arg(short, long)]
        code: String,
        /// Security name
        #[arg(short, long)]
        name: String,
        /// Price point 1
        #[arg(long, alias = "price1")]
        low: f64,
        /// Price point 2
        #[arg(long, alias = "price2")]
        high: f64,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List all observations
    List,
    /// Change one reference price of an observation
    SetPrice {
        id: String,
        #[arg(value_enum)]
        slot: SlotArg,
        value: f64,
    },
    /// Replace the notes of an observation (omit text to clear)
    Note { id: String, text: Option<String> },
    /// Delete an observation
    Remove { id: String },
    /// Build the chart dataset of an observation and print it as JSON
    Chart {
        id: String,
        /// Highlight the high of a trading day (repeatable, YYYYMMDD or YYYY-MM-DD)
        #[arg(long = "highlight")]
        highlights: Vec<String>,
        /// Drop the cached series and fetch again
        #[arg(long)]
        refresh: bool,
        /// Notes saved back to the observation when the chart is closed
        #[arg(long)]
        notes: Option<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Export all observations to a JSON file
    Export {
        /// Target file (defaults to stock_data_<today>.json)
        path: Option<PathBuf>,
    },
    /// Replace all observations with the content of a JSON file
    Import { path: PathBuf },
}
