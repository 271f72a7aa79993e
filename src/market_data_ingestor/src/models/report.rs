//! Exchange end-of-day reports and their typed per-security records.

use serde::{Deserialize, Serialize};

use crate::{
    errors::RecordError,
    models::record::{CODE_COLUMN, NAME_COLUMN, Record, record_code, record_name},
    normalize::ReportSchema,
};

/// The two daily reports the scanner consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Per-security trade summary (`STOCK_DAY_ALL`).
    DailyTrade,
    /// Per-security PE, dividend yield and PB (`BWIBBU_ALL`).
    Valuation,
}

impl ReportKind {
    /// Endpoint name under `exchangeReport/`.
    pub fn endpoint(self) -> &'static str {
        match self {
            ReportKind::DailyTrade => "STOCK_DAY_ALL",
            ReportKind::Valuation => "BWIBBU_ALL",
        }
    }

    /// Numeric columns to normalize for this report.
    pub fn schema(self) -> &'static ReportSchema {
        match self {
            ReportKind::DailyTrade => &DAILY_TRADE_SCHEMA,
            ReportKind::Valuation => &VALUATION_SCHEMA,
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint())
    }
}

pub const TRADE_VOLUME: &str = "TradeVolume";
pub const TRADE_VALUE: &str = "TradeValue";
pub const OPENING_PRICE: &str = "OpeningPrice";
pub const HIGHEST_PRICE: &str = "HighestPrice";
pub const LOWEST_PRICE: &str = "LowestPrice";
pub const CLOSING_PRICE: &str = "ClosingPrice";
pub const PE_RATIO: &str = "PEratio";
pub const DIVIDEND_YIELD: &str = "DividendYield";
pub const PB_RATIO: &str = "PBratio";

static DAILY_TRADE_SCHEMA: ReportSchema = ReportSchema {
    int_columns: &[TRADE_VOLUME, TRADE_VALUE],
    float_columns: &[OPENING_PRICE, HIGHEST_PRICE, LOWEST_PRICE, CLOSING_PRICE],
};

static VALUATION_SCHEMA: ReportSchema = ReportSchema {
    int_columns: &[],
    float_columns: &[PE_RATIO, DIVIDEND_YIELD, PB_RATIO],
};

fn text(record: &Record, column: &'static str) -> Result<String, RecordError> {
    let value = match column {
        CODE_COLUMN => record_code(record),
        NAME_COLUMN => record_name(record),
        _ => None,
    };
    value.map(str::to_string).ok_or(RecordError::MissingText(column))
}

fn int(record: &Record, column: &str) -> Option<i64> {
    record.get(column).and_then(|f| f.as_i64())
}

fn float(record: &Record, column: &str) -> Option<f64> {
    record.get(column).and_then(|f| f.as_f64())
}

/// One security's line in the daily trade summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTradeRecord {
    pub code: String,
    pub name: String,
    pub trade_volume: Option<i64>,
    pub trade_value: Option<i64>,
    pub opening_price: Option<f64>,
    pub highest_price: Option<f64>,
    pub lowest_price: Option<f64>,
    pub closing_price: Option<f64>,
}

impl TryFrom<&Record> for DailyTradeRecord {
    type Error = RecordError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            code: text(record, CODE_COLUMN)?,
            name: text(record, NAME_COLUMN)?,
            trade_volume: int(record, TRADE_VOLUME),
            trade_value: int(record, TRADE_VALUE),
            opening_price: float(record, OPENING_PRICE),
            highest_price: float(record, HIGHEST_PRICE),
            lowest_price: float(record, LOWEST_PRICE),
            closing_price: float(record, CLOSING_PRICE),
        })
    }
}

/// One security's line in the valuation-ratio report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationRecord {
    pub code: String,
    pub name: String,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub pb_ratio: Option<f64>,
}

impl TryFrom<&Record> for ValuationRecord {
    type Error = RecordError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            code: text(record, CODE_COLUMN)?,
            name: text(record, NAME_COLUMN)?,
            pe_ratio: float(record, PE_RATIO),
            dividend_yield: float(record, DIVIDEND_YIELD),
            pb_ratio: float(record, PB_RATIO),
        })
    }
}

/// A security present in both reports, joined on `(code, name)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRecord {
    pub trade: DailyTradeRecord,
    pub valuation: ValuationRecord,
}

impl CombinedRecord {
    pub fn code(&self) -> &str {
        &self.trade.code
    }

    pub fn name(&self) -> &str {
        &self.trade.name
    }
}

impl TryFrom<&Record> for CombinedRecord {
    type Error = RecordError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Self {
            trade: DailyTradeRecord::try_from(record)?,
            valuation: ValuationRecord::try_from(record)?,
        })
    }
}
