//! Per-security history retrieval.
//!
//! Fetches just enough daily bars for the detector's lookback, turns them into
//! a [`Snapshot`], and maps every failure to a [`NoData`] cause. A throttled
//! request suspends the shared [`BackoffGate`] before the cause is reported, so
//! a later retry of the same security starts after the suspension.

use std::sync::Arc;

use market_data_ingestor::{
    errors::SeriesError,
    models::{
        market::Market,
        price_series::{PriceSeries, Snapshot},
    },
    providers::{HistoryProvider, yahoo_chart::params::HistoryRequest},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::backoff::BackoffGate;

/// Why no snapshot could be produced for a security.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoData {
    /// The historical feed throttled the request. Worth retrying.
    #[error("rate limited")]
    RateLimited,
    /// Any other fetch failure.
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// The feed answered, but with too little history.
    #[error(transparent)]
    Series(#[from] SeriesError),
}

impl NoData {
    /// Whether another pass may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NoData::RateLimited)
    }
}

/// Produces detector snapshots from a [`HistoryProvider`].
pub struct SeriesRetriever<H> {
    provider: H,
    market: Market,
    range_day: usize,
    gate: Arc<BackoffGate>,
}

impl<H: HistoryProvider> SeriesRetriever<H> {
    /// Creates a retriever for securities on `market` with a lookback of
    /// `range_day` bars. Retrievers sharing `gate` suspend together.
    pub fn new(provider: H, market: Market, range_day: usize, gate: Arc<BackoffGate>) -> Self {
        Self {
            provider,
            market,
            range_day,
            gate,
        }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &H {
        &self.provider
    }

    /// The shared suspension gate.
    pub fn gate(&self) -> &Arc<BackoffGate> {
        &self.gate
    }

    /// Fetches history for `code` and splits it into a snapshot.
    ///
    /// Waits out any active suspension first. On a throttling signal this call
    /// itself waits for the (possibly shared) suspension to end and then
    /// returns [`NoData::RateLimited`] without retrying.
    pub async fn retrieve(&self, code: &str) -> Result<Snapshot, NoData> {
        self.gate.wait().await;

        let symbol = self.market.symbol(code);
        let request = HistoryRequest::new(&symbol, PriceSeries::required_bars(self.range_day));

        let bars = match self.provider.fetch_daily_bars(&request).await {
            Ok(bars) => bars,
            Err(e) if e.is_rate_limit() => {
                warn!(code, %symbol, error = %e, "history request throttled");
                self.gate.back_off().await;
                return Err(NoData::RateLimited);
            }
            Err(e) => {
                warn!(code, %symbol, error = %e, "history request failed");
                return Err(NoData::Fetch(e.to_string()));
            }
        };

        let series = PriceSeries::from_bars(symbol, bars, self.range_day).inspect_err(|e| {
            warn!(code, error = %e, "unusable history");
        })?;
        debug!(code, bars = series.rows().len(), "history retrieved");
        Ok(series.snapshot())
    }
}
