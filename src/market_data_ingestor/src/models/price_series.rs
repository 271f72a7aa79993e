//! A security's daily bars with precomputed moving-average columns.
//!
//! Moving averages are simple rolling means that use however many observations
//! are available at the start of the series (`min_periods = 1`), so the first
//! value of every average equals the first observation.

use serde::Serialize;

use crate::{errors::SeriesError, models::bar::Bar};

/// Bars kept beyond the lookback window so the 20-day averages are warmed up
/// by the time the window starts.
pub const HISTORY_PADDING: usize = 22;

/// Rolling mean over the trailing `window` values, averaging over fewer values
/// at the start of the series.
///
/// A zero window is treated as a window of one.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        out.push(sum / n as f64);
    }
    out
}

/// One bar plus its derived averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRow {
    pub bar: Bar,
    pub close_ma5: f64,
    pub close_ma10: f64,
    pub close_ma20: f64,
    pub volume_ma5: f64,
    pub volume_ma10: f64,
    pub volume_ma20: f64,
    /// Volume average over the configured lookback (`range_day` bars).
    pub volume_ma_range: f64,
}

/// Ordered daily history for one security. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    range_day: usize,
    rows: Vec<SeriesRow>,
}

impl PriceSeries {
    /// Minimum number of bars a series needs for a lookback of `range_day`.
    pub fn required_bars(range_day: usize) -> usize {
        range_day + HISTORY_PADDING
    }

    /// Sorts `bars` by date (of two same-date bars, the one later in `bars`
    /// wins), checks the
    /// length invariant and derives every average column.
    ///
    /// # Errors
    ///
    /// - [`SeriesError::EmptyRange`] if `range_day` is zero.
    /// - [`SeriesError::InsufficientHistory`] if fewer than
    ///   [`required_bars`](Self::required_bars) bars remain.
    pub fn from_bars(
        symbol: impl Into<String>,
        mut bars: Vec<Bar>,
        range_day: usize,
    ) -> Result<Self, SeriesError> {
        if range_day == 0 {
            return Err(SeriesError::EmptyRange);
        }
        bars.sort_by_key(|b| b.date);
        // dedup_by keeps the first of a run; reverse so the latest copy survives.
        bars.reverse();
        bars.dedup_by_key(|b| b.date);
        bars.reverse();

        let need = Self::required_bars(range_day);
        if bars.len() < need {
            return Err(SeriesError::InsufficientHistory {
                have: bars.len(),
                need,
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let close_ma5 = rolling_mean(&closes, 5);
        let close_ma10 = rolling_mean(&closes, 10);
        let close_ma20 = rolling_mean(&closes, 20);
        let volume_ma5 = rolling_mean(&volumes, 5);
        let volume_ma10 = rolling_mean(&volumes, 10);
        let volume_ma20 = rolling_mean(&volumes, 20);
        let volume_ma_range = rolling_mean(&volumes, range_day);

        let rows = bars
            .into_iter()
            .enumerate()
            .map(|(i, bar)| SeriesRow {
                bar,
                close_ma5: close_ma5[i],
                close_ma10: close_ma10[i],
                close_ma20: close_ma20[i],
                volume_ma5: volume_ma5[i],
                volume_ma10: volume_ma10[i],
                volume_ma20: volume_ma20[i],
                volume_ma_range: volume_ma_range[i],
            })
            .collect();

        Ok(Self {
            symbol: symbol.into(),
            range_day,
            rows,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn range_day(&self) -> usize {
        self.range_day
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    /// Splits the series into the views the detector works on.
    pub fn snapshot(&self) -> Snapshot {
        let n = self.rows.len();
        // from_bars guarantees n >= range_day + HISTORY_PADDING > range_day + 2.
        Snapshot {
            latest: self.rows[n - 1].clone(),
            previous: self.rows[n - 2].clone(),
            window: self.rows[n - 2 - self.range_day..n - 2].to_vec(),
        }
    }
}

/// The latest bar, the bar before it, and the `range_day` bars before that.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub latest: SeriesRow,
    pub previous: SeriesRow,
    /// Oldest first; never contains `previous` or `latest`.
    pub window: Vec<SeriesRow>,
}

impl Snapshot {
    /// The oldest bar of the lookback window.
    pub fn window_oldest(&self) -> Option<&SeriesRow> {
        self.window.first()
    }
}
