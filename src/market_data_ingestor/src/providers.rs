//! Provider abstraction for the two upstream feeds.
//!
//! - [`ReportProvider`]: the exchange's end-of-day reports, returned as raw JSON
//!   and normalized by [`load_report`].
//! - [`HistoryProvider`]: daily OHLCV history for one symbol.
//!
//! Both traits are async and object safe so callers can hold a
//! `Box<dyn HistoryProvider>` chosen at runtime, or a test double.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::bar::Bar;
//! use market_data_ingestor::providers::{HistoryProvider, ProviderError, yahoo_chart::params::HistoryRequest};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl HistoryProvider for Empty {
//!     async fn fetch_daily_bars(&self, _request: &HistoryRequest) -> Result<Vec<Bar>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod twse_openapi;
pub mod yahoo_chart;

use async_trait::async_trait;
use reqwest::StatusCode;
use snafu::{Backtrace, Snafu};
use tracing::error;

use crate::{
    models::{bar::Bar, record::RecordSet, report::ReportKind},
    normalize::normalize_payload,
    providers::yahoo_chart::params::HistoryRequest,
};

/// Error text fragments by which the historical feed signals throttling.
const RATE_LIMIT_MARKERS: &[&str] = &["too many requests", "rate limit"];

/// Fetches one of the exchange's daily reports as raw JSON.
#[async_trait]
pub trait ReportProvider: Send + Sync {
    async fn fetch_report(&self, kind: ReportKind) -> Result<serde_json::Value, ProviderError>;
}

/// Fetches daily bars for one symbol.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Returns at most `request.limit` of the most recent daily bars, oldest
    /// first. May return fewer than requested.
    async fn fetch_daily_bars(&self, request: &HistoryRequest) -> Result<Vec<Bar>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a provider implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider answered with a non-success status.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The provider is throttling us.
    #[snafu(display("Rate limited: {message}"))]
    RateLimited {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body was not in the expected shape.
    #[snafu(display("Unexpected payload: {message}"))]
    Payload {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

impl ProviderError {
    /// Whether this error is the upstream's rate-limit signal, either by status
    /// or by its message text.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } => true,
            ProviderError::Api {
                status, message, ..
            } => *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || mentions_rate_limit(message),
            ProviderError::Reqwest { source, .. } => {
                source.status() == Some(StatusCode::TOO_MANY_REQUESTS)
                    || mentions_rate_limit(&source.to_string())
            }
            ProviderError::Payload { message, .. } => mentions_rate_limit(message),
            _ => false,
        }
    }
}

/// Whether an upstream error message reads as a throttling notice.
pub fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Fetches and normalizes one report.
///
/// Every failure (transport, non-success status, payload that is not a list of
/// records) is logged and reported as `None`; the scan continues without the
/// report. An empty list (no session data published yet) counts as a failure
/// too.
pub async fn load_report<P>(provider: &P, kind: ReportKind) -> Option<RecordSet>
where
    P: ReportProvider + ?Sized,
{
    let payload = match provider.fetch_report(kind).await {
        Ok(payload) => payload,
        Err(e) => {
            error!(report = %kind, error = %e, "report fetch failed");
            return None;
        }
    };
    let Some(set) = normalize_payload(&payload, kind.schema()) else {
        error!(report = %kind, "report payload is not a list of records");
        return None;
    };
    if set.is_empty() {
        error!(report = %kind, "report has no records");
        return None;
    }
    Some(set)
}
