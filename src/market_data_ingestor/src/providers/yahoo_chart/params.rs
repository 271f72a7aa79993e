use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::{ProviderError, ValidationSnafu};

/// Request for the most recent daily bars of one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Feed symbol including the market suffix (e.g., `2330.TW`).
    pub symbol: String,

    /// Maximum number of bars to return, counted back from `end`.
    pub limit: usize,

    /// End of the requested range (exclusive, UTC).
    pub end: DateTime<Utc>,
}

impl HistoryRequest {
    /// Requests the `limit` most recent bars up to now.
    pub fn new(symbol: impl Into<String>, limit: usize) -> Self {
        Self {
            symbol: symbol.into(),
            limit,
            end: Utc::now(),
        }
    }
}

/// Calendar days to ask for so that `limit` trading days fit, with room for
/// weekends and exchange holidays.
pub fn lookback_days(limit: usize) -> i64 {
    limit as i64 * 2 + 14
}

pub fn validate_request(request: &HistoryRequest) -> Result<(), ProviderError> {
    if request.symbol.trim().is_empty() {
        return ValidationSnafu {
            message: "symbol must not be empty",
        }
        .fail();
    }
    if request.limit == 0 {
        return ValidationSnafu {
            message: "limit must be at least 1",
        }
        .fail();
    }
    Ok(())
}

/// Query string for the chart endpoint.
pub fn construct_params(request: &HistoryRequest) -> Vec<(String, String)> {
    let start = request.end - Duration::days(lookback_days(request.limit));
    vec![
        ("period1".to_string(), start.timestamp().to_string()),
        ("period2".to_string(), request.end.timestamp().to_string()),
        ("interval".to_string(), "1d".to_string()),
        ("events".to_string(), "history".to_string()),
    ]
}
