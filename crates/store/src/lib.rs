pub mod config;
pub mod kv;
pub mod watchlist;
