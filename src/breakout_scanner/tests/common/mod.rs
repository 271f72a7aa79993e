#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use market_data_ingestor::{
    models::{
        bar::Bar,
        price_series::{PriceSeries, Snapshot},
        report::ReportKind,
    },
    providers::{
        ApiSnafu, HistoryProvider, ProviderError, RateLimitedSnafu, ReportProvider,
        yahoo_chart::params::HistoryRequest,
    },
};
use serde_json::{Value, json};
use tokio::time::Instant;

/// Positions inside [`breakout_bars`].
pub const LATEST: usize = 31;
pub const PREVIOUS: usize = 30;
/// Oldest bar of the 10-day window.
pub const REFERENCE: usize = 20;

pub fn bar(day: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Bar {
    Bar {
        date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap() + Days::new(day as u64),
        open,
        high,
        low,
        close,
        volume,
    }
}

/// 32 sessions ending in a breakout the default detector accepts.
///
/// - flat 100 prices at 900k volume for 20 days
/// - a quiet reference day at 400k, then 887.5k for the rest of the window
/// - closes of 110 on the last three window days, lifting the 5-day average
/// - previous day: up-candle to 102 on 900k
/// - latest day: up-candle to 110 on 2M, exactly twice its 10-day average
pub fn breakout_bars() -> Vec<Bar> {
    (0..=LATEST)
        .map(|day| match day {
            0..REFERENCE => bar(day, 100.0, 101.0, 99.0, 100.0, 900_000.0),
            REFERENCE => bar(day, 100.0, 101.0, 99.0, 100.0, 400_000.0),
            21..=26 => bar(day, 100.0, 101.0, 99.0, 100.0, 887_500.0),
            27..=29 => bar(day, 109.0, 111.0, 108.0, 110.0, 887_500.0),
            PREVIOUS => bar(day, 100.0, 103.0, 99.5, 102.0, 900_000.0),
            _ => bar(day, 102.0, 111.0, 101.0, 110.0, 2_000_000.0),
        })
        .collect()
}

pub fn snapshot(bars: Vec<Bar>) -> Snapshot {
    PriceSeries::from_bars("2330.TW", bars, 10).unwrap().snapshot()
}

/// One scripted answer of [`ScriptedHistory`].
#[derive(Clone)]
pub enum Scripted {
    Bars(Vec<Bar>),
    RateLimited,
    Status(u16),
}

/// History provider answering from per-symbol scripts and recording when it
/// was called. Symbols without a (remaining) script answer 404.
#[derive(Default)]
pub struct ScriptedHistory {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, symbol: &str, steps: impl IntoIterator<Item = Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(symbol.to_string(), steps.into_iter().collect());
        self
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s == symbol)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HistoryProvider for ScriptedHistory {
    async fn fetch_daily_bars(&self, request: &HistoryRequest) -> Result<Vec<Bar>, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.symbol.clone(), Instant::now()));
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.symbol)
            .and_then(VecDeque::pop_front);

        match step {
            Some(Scripted::Bars(mut bars)) => {
                if bars.len() > request.limit {
                    bars.drain(..bars.len() - request.limit);
                }
                Ok(bars)
            }
            Some(Scripted::RateLimited) => RateLimitedSnafu {
                message: "Too Many Requests",
            }
            .fail(),
            Some(Scripted::Status(status)) => ApiSnafu {
                status,
                message: "scripted failure",
            }
            .fail(),
            None => ApiSnafu {
                status: 404u16,
                message: "Not Found: No data found, symbol may be delisted",
            }
            .fail(),
        }
    }
}

/// Report provider serving fixed payloads; a missing payload answers 503.
pub struct StaticReports {
    pub daily: Option<Value>,
    pub valuation: Option<Value>,
}

#[async_trait]
impl ReportProvider for StaticReports {
    async fn fetch_report(&self, kind: ReportKind) -> Result<Value, ProviderError> {
        let payload = match kind {
            ReportKind::DailyTrade => &self.daily,
            ReportKind::Valuation => &self.valuation,
        };
        match payload {
            Some(value) => Ok(value.clone()),
            None => ApiSnafu {
                status: 503u16,
                message: "maintenance",
            }
            .fail(),
        }
    }
}

pub fn daily_row(code: &str, name: &str, volume: &str, value: &str) -> Value {
    json!({
        "Code": code, "Name": name, "TradeVolume": volume, "TradeValue": value,
        "OpeningPrice": "100.00", "HighestPrice": "111.00", "LowestPrice": "99.00",
        "ClosingPrice": "110.00", "Change": "+8.00", "Transaction": "12,345"
    })
}

pub fn valuation_row(code: &str, name: &str) -> Value {
    json!({
        "Code": code, "Name": name, "PEratio": "15.20",
        "DividendYield": "2.35", "PBratio": "3.10"
    })
}
