use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, StatusCode};
use shared_utils::env::env_var_or;
use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::{
    models::bar::Bar,
    providers::{
        ApiSnafu, ClientBuildSnafu, HistoryProvider, PayloadSnafu, ProviderError, ProviderInitError,
        RateLimitedSnafu, ReqwestSnafu,
        yahoo_chart::{
            params::{HistoryRequest, construct_params, validate_request},
            response::{ChartEnvelope, Quote},
        },
    },
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
/// Overrides [`BASE_URL`], e.g. to point at a proxy.
const BASE_URL_ENV: &str = "YAHOO_CHART_BASE_URL";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) breakout-scanner";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Used when the response does not name the exchange's time zone.
const DEFAULT_TZ: Tz = chrono_tz::Asia::Taipei;

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl YahooChartProvider {
    /// Creates a provider against the public chart endpoint, or the one named
    /// by `YAHOO_CHART_BASE_URL`.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_base_url(env_var_or(BASE_URL_ENV, BASE_URL))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_second(nonzero!(2u32))),
        })
    }

    /// Client-side request budget, applied before every request.
    pub fn with_requests_per_second(mut self, rps: NonZeroU32) -> Self {
        self.limiter = RateLimiter::direct(Quota::per_second(rps));
        self
    }
}

fn value_at(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten().filter(|v| v.is_finite())
}

fn bar_at(quote: &Quote, timestamp: i64, i: usize, tz: Tz) -> Option<Bar> {
    let date = DateTime::from_timestamp(timestamp, 0)?
        .with_timezone(&tz)
        .date_naive();
    Some(Bar {
        date,
        open: value_at(&quote.open, i)?,
        high: value_at(&quote.high, i)?,
        low: value_at(&quote.low, i)?,
        close: value_at(&quote.close, i)?,
        volume: value_at(&quote.volume, i)?,
    })
}

/// Converts a chart response into at most `limit` of its most recent bars.
///
/// Sessions with any missing column are skipped.
pub fn bars_from_chart(envelope: ChartEnvelope, limit: usize) -> Result<Vec<Bar>, ProviderError> {
    if let Some(err) = envelope.chart.error {
        return ApiSnafu {
            status: StatusCode::OK.as_u16(),
            message: format!("{}: {}", err.code, err.description),
        }
        .fail();
    }
    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .context(PayloadSnafu {
            message: "chart response has no result",
        })?;

    let tz = result
        .meta
        .exchange_timezone_name
        .as_deref()
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(DEFAULT_TZ);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars: Vec<Bar> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| bar_at(&quote, *ts, i, tz))
        .collect();
    if bars.len() > limit {
        bars.drain(..bars.len() - limit);
    }
    debug!(symbol = %result.meta.symbol, bars = bars.len(), "parsed chart response");
    Ok(bars)
}

#[async_trait]
impl HistoryProvider for YahooChartProvider {
    async fn fetch_daily_bars(&self, request: &HistoryRequest) -> Result<Vec<Bar>, ProviderError> {
        validate_request(request)?;
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, request.symbol);
        let response = self
            .client
            .get(&url)
            .query(&construct_params(request))
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let message = if body.trim().is_empty() {
                "Too Many Requests".to_string()
            } else {
                body
            };
            return RateLimitedSnafu { message }.fail();
        }

        if !status.is_success() {
            // The chart endpoint explains 4xx answers in `chart.error`.
            let message = serde_json::from_str::<ChartEnvelope>(&body)
                .ok()
                .and_then(|e| e.chart.error)
                .map(|e| format!("{}: {}", e.code, e.description))
                .unwrap_or(body);
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        let envelope: ChartEnvelope = serde_json::from_str(&body).map_err(|e| {
            PayloadSnafu {
                message: e.to_string(),
            }
            .build()
        })?;
        bars_from_chart(envelope, request.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> ChartEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn converts_timestamps_to_exchange_dates() {
        // 2025-03-03 01:00 UTC is 09:00 in Taipei, the session open.
        let chart = envelope(json!({"chart": {"result": [{
            "meta": {"symbol": "2330.TW", "exchangeTimezoneName": "Asia/Taipei"},
            "timestamp": [1740963600, 1741050000],
            "indicators": {"quote": [{
                "open": [1000.0, 1010.0], "high": [1020.0, 1030.0], "low": [990.0, 1000.0],
                "close": [1015.0, 1025.0], "volume": [31000000.0, 28000000.0]
            }]}
        }], "error": null}}));

        let bars = bars_from_chart(chart, 10).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date.to_string(), "2025-03-03");
        assert_eq!(bars[1].date.to_string(), "2025-03-04");
        assert_eq!(bars[1].close, 1025.0);
    }

    #[test]
    fn skips_null_sessions_and_applies_limit() {
        let chart = envelope(json!({"chart": {"result": [{
            "meta": {"symbol": "2330.TW"},
            "timestamp": [1740963600, 1741050000, 1741136400],
            "indicators": {"quote": [{
                "open": [1.0, null, 3.0], "high": [1.0, 2.0, 3.0], "low": [1.0, 2.0, 3.0],
                "close": [1.0, 2.0, 3.0], "volume": [10.0, 20.0, 30.0]
            }]}
        }], "error": null}}));

        let bars = bars_from_chart(chart, 1).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 30.0);
    }

    #[test]
    fn chart_error_becomes_api_error() {
        let chart = envelope(json!({"chart": {"result": null, "error": {
            "code": "Not Found", "description": "No data found, symbol may be delisted"
        }}}));
        let err = bars_from_chart(chart, 10).unwrap_err();
        assert!(matches!(err, ProviderError::Api { .. }));
        assert!(err.to_string().contains("delisted"));
    }
}
