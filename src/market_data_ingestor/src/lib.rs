//! Market data ingestion for the breakout scanner.
//!
//! - [`providers`]: the exchange report feed and the daily-history feed.
//! - [`normalize`]: raw report payloads into typed, nullable columns.
//! - [`reconcile`]: inner join of two reports on `(Code, Name)`.
//! - [`models`]: report records, daily bars and [`PriceSeries`](models::price_series::PriceSeries).

pub mod errors;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod reconcile;
