//! Canonical in-memory representation of a daily bar (OHLCV).
//!
//! This struct is the standard output of every
//! [`HistoryProvider`](crate::providers::HistoryProvider) implementation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single daily bar for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// The trading date, in the exchange's local calendar.
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price of the day.
    pub high: f64,

    /// Lowest price of the day.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Shares traded during the day.
    pub volume: f64,
}
